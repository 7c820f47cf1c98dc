//! Peripheral sections of the header: storage, IMU, buses, ADC, LEDs.

use pinmux_board::ConfigModel;
use pinmux_core::{hash_hex, GpioRole, PeripheralKind, ResourceType, Signal};
use pinmux_resolve::{ResolvedBoard, ResolvedBus, ValidatedAssignment};

use crate::emit::Emitter;
use crate::generate::GeneratorOptions;

/// Pin expression for a resolved assignment, `NC` when absent.
pub(crate) fn pin_expr(assignment: Option<&ValidatedAssignment>) -> String {
    assignment.map_or_else(|| "NC".to_string(), |a| a.pin_variant().canonical())
}

/// `// <TYPE> <index>: omitted (unresolved)` for each dropped resource.
pub(crate) fn placeholders(out: &mut Emitter, board: &ResolvedBoard, resource: &ResourceType) {
    let mut any = false;
    for index in board.dropped_of(resource) {
        out.line(format!("// {} {index}: omitted (unresolved)", resource.keyword()));
        any = true;
    }
    if any {
        out.blank();
    }
}

fn setting_u32(config: &ConfigModel, key: &str, default: u32) -> u32 {
    config
        .setting(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn device_bus(config: &ConfigModel, key: &str, default: u8) -> u8 {
    config
        .setting(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Gyro chips from `USE_GYRO_SPI_*` hints, falling back to `USE_ACC_SPI_*`.
pub(crate) fn gyro_chips(config: &ConfigModel) -> Vec<String> {
    let hints = config.chip_hints();
    let mut chips: Vec<String> = Vec::new();
    for category in ["GYRO_SPI", "ACC_SPI"] {
        for chip in hints.declared_in(category) {
            if !chip.is_empty() && !chips.iter().any(|c| c == chip) {
                chips.push(chip.to_string());
            }
        }
        if !chips.is_empty() {
            break;
        }
    }
    chips
}

pub(crate) fn file_header(out: &mut Emitter, board: &ResolvedBoard, options: &GeneratorOptions) {
    out.line("/*");
    out.line(" * Auto-generated BoardConfig from Betaflight unified target");
    if let Some(name) = &options.source_name {
        out.line(format!(" * Source: {name}"));
    }
    if let Some(digest) = &options.source_digest {
        out.line(format!(" * Source digest: sha256:{}", hash_hex(digest)));
    }
    out.line(format!(" * Generator: pinmux {}", env!("CARGO_PKG_VERSION")));
    out.line(" */");
    out.blank();
    out.line("#pragma once");
    out.blank();
    out.line("#include \"ConfigTypes.h\"");
    out.blank();

    let config = &board.config;
    if let Some(name) = config.board_name() {
        out.line(format!("// Board: {name}"));
    }
    if let Some(id) = config.manufacturer_id() {
        out.line(format!("// Manufacturer: {id}"));
    }
    out.line(format!("// MCU: {}", board.mcu));

    let gyros = gyro_chips(config);
    if !gyros.is_empty() {
        out.line(format!("// Gyro: {}", gyros.join(", ")));
    }
    let others: Vec<String> = config
        .chip_hints()
        .selections()
        .filter(|(category, _)| !matches!(*category, "GYRO_SPI" | "ACC_SPI"))
        .map(|(category, variant)| match variant {
            "" => category.to_string(),
            v => format!("{category} {v}"),
        })
        .collect();
    if !others.is_empty() {
        out.line(format!("// Features: {}", others.join(", ")));
    }
}

/// SPI pins in `mosi, miso, sclk` order.
fn spi_pins(bus: &ResolvedBus) -> String {
    [Signal::SpiMosi, Signal::SpiMiso, Signal::SpiSclk]
        .map(|s| pin_expr(bus.pin_for(s)))
        .join(", ")
}

/// Storage on SPI flash or SD card. Returns the bus index it consumed.
pub(crate) fn storage(out: &mut Emitter, board: &ResolvedBoard, options: &GeneratorOptions) -> Option<u8> {
    let config = &board.config;
    let flash = board.first_gpio(GpioRole::FlashCs);
    let sdcard = board.first_gpio(GpioRole::SdcardCs);
    let prefer_flash = config
        .setting("blackbox_device")
        .is_some_and(|v| v.eq_ignore_ascii_case("SPIFLASH"));

    let (cs, backend, device, bus_index) = match (flash, sdcard) {
        (Some(cs), None) => (cs, "LITTLEFS", flash_device(config), device_bus(config, "flash_spi_bus", 2)),
        (Some(cs), Some(_)) if prefer_flash => {
            (cs, "LITTLEFS", flash_device(config), device_bus(config, "flash_spi_bus", 2))
        }
        (_, Some(cs)) => (cs, "SDFS", "SD card".to_string(), device_bus(config, "sdcard_spi_bus", 3)),
        (None, None) => return None,
    };

    let Some(bus) = board.bus(PeripheralKind::Spi, bus_index) else {
        out.line(format!("// Storage: omitted (SPI bus {bus_index} unresolved)"));
        out.blank();
        return None;
    };
    out.line(format!("// Storage: {device} on {}", bus.instance));
    out.line(format!(
        "static constexpr StorageConfig storage{{StorageBackend::{backend}, {}, {}, {}}};",
        spi_pins(bus),
        pin_expr(Some(cs)),
        options.spi_clock_hz
    ));
    out.blank();
    Some(bus_index)
}

fn flash_device(config: &ConfigModel) -> String {
    match config.chip_hints().selected("FLASH") {
        Some(chip) if !chip.is_empty() => format!("{chip} SPI flash"),
        _ => "SPI flash".to_string(),
    }
}

/// IMU on its SPI bus. Returns the bus index it consumed.
pub(crate) fn imu(out: &mut Emitter, board: &ResolvedBoard, options: &GeneratorOptions) -> Option<u8> {
    let cs = board.first_gpio(GpioRole::GyroCs)?;
    let bus_index = device_bus(&board.config, "gyro_1_spibus", 1);
    let Some(bus) = board.bus(PeripheralKind::Spi, bus_index) else {
        out.line(format!("// IMU: omitted (SPI bus {bus_index} unresolved)"));
        out.blank();
        return None;
    };

    let chips = gyro_chips(&board.config);
    let label = if chips.is_empty() { "IMU".to_string() } else { chips.join(", ") };
    // IMUConfig takes 0 for "no interrupt".
    let interrupt = board
        .first_gpio(GpioRole::GyroExti)
        .map_or_else(|| "0".to_string(), |a| a.pin_variant().canonical());

    out.line(format!("// IMU: {label} on {}", bus.instance));
    out.line(format!(
        "static constexpr SPIConfig imu_spi{{{}, {}, {}, CS_Mode::HARDWARE}};",
        spi_pins(bus),
        pin_expr(Some(cs)),
        options.spi_clock_hz
    ));
    out.line(format!(
        "static constexpr IMUConfig imu{{imu_spi, {interrupt}, {}}};",
        options.imu_setup_clock_hz
    ));
    out.blank();
    Some(bus_index)
}

pub(crate) fn i2c(out: &mut Emitter, board: &ResolvedBoard, options: &GeneratorOptions) {
    let buses: Vec<&ResolvedBus> = board.buses_of(PeripheralKind::I2c).collect();
    for signal in [Signal::I2cScl, Signal::I2cSda] {
        placeholders(out, board, &ResourceType::Bus(signal));
    }
    for bus in &buses {
        let (name, usage) = if buses.len() == 1 {
            ("sensors".to_string(), "Environmental sensors")
        } else {
            (format!("i2c{}", bus.index), "External sensors")
        };
        out.line(format!("// {}: {usage}", bus.instance));
        out.line(format!(
            "static constexpr I2CConfig {name}{{{}, {}, {}}};",
            pin_expr(bus.pin_for(Signal::I2cSda)),
            pin_expr(bus.pin_for(Signal::I2cScl)),
            options.i2c_clock_hz
        ));
        out.blank();
    }
}

pub(crate) fn uarts(out: &mut Emitter, board: &ResolvedBoard, options: &GeneratorOptions) {
    for signal in [Signal::UartTx, Signal::UartRx] {
        placeholders(out, board, &ResourceType::Bus(signal));
    }
    for bus in board.buses_of(PeripheralKind::Uart) {
        out.line(format!("// {}: Serial port", bus.instance));
        out.line(format!(
            "static constexpr UARTConfig uart{}{{{}, {}, {}}};",
            bus.index,
            pin_expr(bus.pin_for(Signal::UartTx)),
            pin_expr(bus.pin_for(Signal::UartRx)),
            options.uart_baud
        ));
        out.blank();
    }
}

/// SPI buses not claimed by storage or the IMU.
pub(crate) fn other_spi(out: &mut Emitter, board: &ResolvedBoard, options: &GeneratorOptions, claimed: &[u8]) {
    for signal in [Signal::SpiMosi, Signal::SpiMiso, Signal::SpiSclk] {
        placeholders(out, board, &ResourceType::Bus(signal));
    }
    let osd_bus = board
        .config
        .setting("max7456_spi_bus")
        .and_then(|v| v.trim().parse::<u8>().ok());

    for bus in board
        .buses_of(PeripheralKind::Spi)
        .filter(|b| !claimed.contains(&b.index))
    {
        let osd_cs = board
            .first_gpio(GpioRole::OsdCs)
            .filter(|_| osd_bus == Some(bus.index));
        match osd_cs {
            Some(cs) => {
                out.line(format!("// {}: OSD", bus.instance));
                out.line(format!(
                    "static constexpr SPIConfig osd_spi{{{}, {}, {}, CS_Mode::HARDWARE}};",
                    spi_pins(bus),
                    pin_expr(Some(cs)),
                    options.spi_clock_hz
                ));
            }
            None => {
                out.line(format!("// {}: General purpose", bus.instance));
                out.line(format!(
                    "static constexpr SPIConfig spi{}{{{}, NC, {}}};",
                    bus.index,
                    spi_pins(bus),
                    options.spi_clock_hz
                ));
            }
        }
        out.blank();
    }
}

pub(crate) fn adc(out: &mut Emitter, board: &ResolvedBoard) {
    for role in [GpioRole::AdcBatt, GpioRole::AdcCurr, GpioRole::AdcRssi] {
        placeholders(out, board, &ResourceType::Gpio(role));
    }
    let battery = board.first_gpio(GpioRole::AdcBatt);
    let current = board.first_gpio(GpioRole::AdcCurr);
    if battery.is_some() || current.is_some() {
        let config = &board.config;
        let pin = |a: Option<&ValidatedAssignment>| {
            a.map_or_else(|| "0".to_string(), |a| a.pin_variant().canonical())
        };
        out.line("// ADC: Battery voltage and current monitoring");
        out.line(format!(
            "static constexpr ADCConfig battery{{{}, {}, {}, {}}};",
            pin(battery),
            pin(current),
            setting_u32(config, "vbat_scale", 110),
            setting_u32(config, "ibata_scale", 170)
        ));
        out.blank();
    }
    if let Some(rssi) = board.first_gpio(GpioRole::AdcRssi) {
        out.line("// ADC: RSSI input");
        let label = rssi.entry().map(|e| e.label()).unwrap_or_default();
        out.line(format!(
            "static constexpr uint32_t rssi_pin = {};  // {label}",
            rssi.pin_variant().canonical()
        ));
        out.blank();
    }
}

/// Status LEDs (at most two) and the beeper.
pub(crate) fn leds(out: &mut Emitter, board: &ResolvedBoard) {
    let leds: Vec<String> = board
        .gpio_of(GpioRole::Led)
        .into_iter()
        .take(2)
        .map(|a| a.pin_variant().canonical())
        .collect();
    if !leds.is_empty() {
        out.line("// Status LEDs");
        out.line(format!("static constexpr LEDConfig status_leds{{{}}};", leds.join(", ")));
        out.blank();
    }

    if let Some(beeper) = board.first_gpio(GpioRole::Beeper) {
        out.line("// Beeper");
        out.line(format!(
            "static constexpr uint32_t beeper_pin = {};",
            beeper.pin_variant().canonical()
        ));
        if let Some(inversion) = board.config.setting("beeper_inversion") {
            let inverted = inversion.eq_ignore_ascii_case("ON");
            out.line(format!("static constexpr bool beeper_inverted = {inverted};"));
        }
        out.blank();
    }
}

/// Unmodeled resources and passthrough statements, as comments.
pub(crate) fn passthrough(out: &mut Emitter, board: &ResolvedBoard) {
    let config = &board.config;
    let unmodeled: Vec<String> = config
        .resources()
        .iter()
        .filter(|r| !r.resource.is_modeled())
        .map(|r| format!("resource {} {} {}", r.resource.keyword(), r.index, r.pin))
        .collect();
    let statements: Vec<&str> = config.passthrough().iter().map(|p| p.text.as_str()).collect();
    if unmodeled.is_empty() && statements.is_empty() {
        return;
    }

    out.blank();
    out.line("// Not translated (kept for reference):");
    for text in unmodeled.iter().map(String::as_str).chain(statements) {
        out.line(format!("//   {text}"));
    }
}
