/*
 * Hardware Discovery Tool
 *
 * Scans the USB serial ports for compatible FPGA boards and probes the
 * identity of the resolved device.
 *
 * Probing is read-only: the tool connects with zero channels, reads the
 * firmware version and board id registers, and disconnects. Run it once
 * at setup time, not during an acquisition — scanning opens every
 * candidate port.
 */

use anyhow::Result;
use fpga_trigger::{discovery, ControllerConfig, FpgaController, SerialConfig};

fn main() -> Result<()> {
    env_logger::init();

    println!("Scanning for compatible FPGA boards...");

    let candidates = discovery::list_candidate_ports()?;
    if candidates.is_empty() {
        println!(
            "No board found (vendor/product {:04x}:{:04x}).",
            discovery::USB_VENDOR_ID,
            discovery::USB_PRODUCT_ID
        );
        return Ok(());
    }

    for device in &candidates {
        println!("Candidate port: {device}");
    }
    if candidates.len() > 1 {
        println!("Multiple candidates; FTDI drivers may expose one board as two ports.");
    }

    // Probe each candidate in turn; a controller with zero channels only
    // performs the identity exchange.
    for device in &candidates {
        let config = ControllerConfig {
            use_camera: false,
            known_device: Some(device.clone()),
            ..ControllerConfig::default()
        };

        match FpgaController::open(&config, &SerialConfig::default()) {
            Ok(controller) if controller.is_connected() => {
                println!(
                    "{device}: {} board, firmware version {}",
                    controller.board_name(),
                    controller.firmware_version()
                );
            }
            Ok(_) => {
                println!("{device}: no compatible board (see warnings above)");
            }
            Err(err) => {
                println!("{device}: probe failed: {err}");
            }
        }
    }

    Ok(())
}
