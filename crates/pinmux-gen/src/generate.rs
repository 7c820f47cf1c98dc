//! Header rendering.

use pinmux_core::{OutputFamily, SourceDigest};
use pinmux_resolve::ResolvedBoard;

use crate::banks;
use crate::emit::Emitter;
use crate::sections;

/// Rendering options. Nothing here depends on the clock or the environment,
/// so equal inputs render to equal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// File name of the board definition, shown in the header comment.
    pub source_name: Option<String>,
    /// Digest of the inputs, shown in place of a timestamp.
    pub source_digest: Option<SourceDigest>,
    pub spi_clock_hz: u32,
    /// Slow clock used while the IMU is being configured.
    pub imu_setup_clock_hz: u32,
    pub i2c_clock_hz: u32,
    pub uart_baud: u32,
    /// Emit unmodeled statements as trailing comments.
    pub passthrough: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            source_name: None,
            source_digest: None,
            spi_clock_hz: 8_000_000,
            imu_setup_clock_hz: 1_000_000,
            i2c_clock_hz: 400_000,
            uart_baud: 115_200,
            passthrough: true,
        }
    }
}

/// Render a resolved board as a `BoardConfig` header.
///
/// Sections appear in a fixed order: storage, IMU, I2C, UARTs, remaining
/// SPI buses, ADC, LEDs, then servo, motor, and LED-strip banks. Resources
/// dropped during resolution leave a placeholder comment.
pub fn generate(board: &ResolvedBoard, options: &GeneratorOptions) -> String {
    let mut out = Emitter::new();
    sections::file_header(&mut out, board, options);

    out.open("namespace BoardConfig {");
    let claimed: Vec<u8> = [
        sections::storage(&mut out, board, options),
        sections::imu(&mut out, board, options),
    ]
    .into_iter()
    .flatten()
    .collect();
    sections::i2c(&mut out, board, options);
    sections::uarts(&mut out, board, options);
    sections::other_spi(&mut out, board, options, &claimed);
    sections::adc(&mut out, board);
    sections::leds(&mut out, board);
    for family in [OutputFamily::Servo, OutputFamily::Motor, OutputFamily::LedStrip] {
        banks::family(&mut out, board, family);
    }
    out.close("}");

    if options.passthrough {
        sections::passthrough(&mut out, board);
    }

    let text = out.finish();
    tracing::info!(
        "generated {} line(s) for {}",
        text.lines().count(),
        board.config.board_name().unwrap_or(board.mcu.as_str())
    );
    text
}
