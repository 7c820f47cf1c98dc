//! Peripheral kinds, bus signals, and peripheral instance names.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{CoreError, Result};

/// The class of on-chip peripheral a pin can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeripheralKind {
    Timer,
    Spi,
    I2c,
    Uart,
    Adc,
}

impl PeripheralKind {
    /// Instance-name prefixes that belong to this kind.
    ///
    /// `LPUART` is deliberately absent: low-power UARTs are numbered
    /// independently and never match a logical serial port index.
    pub fn instance_prefixes(&self) -> &'static [&'static str] {
        match self {
            PeripheralKind::Timer => &["TIM"],
            PeripheralKind::Spi => &["SPI"],
            PeripheralKind::I2c => &["I2C"],
            PeripheralKind::Uart => &["USART", "UART"],
            PeripheralKind::Adc => &["ADC"],
        }
    }

    /// Parse a kind from a user-supplied name (`timer`, `spi`, `serial`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "timer" | "tim" => Some(PeripheralKind::Timer),
            "spi" => Some(PeripheralKind::Spi),
            "i2c" => Some(PeripheralKind::I2c),
            "uart" | "usart" | "serial" => Some(PeripheralKind::Uart),
            "adc" => Some(PeripheralKind::Adc),
            _ => None,
        }
    }

    /// All kinds, in index-building order.
    pub fn all() -> [PeripheralKind; 5] {
        [
            PeripheralKind::Timer,
            PeripheralKind::Spi,
            PeripheralKind::I2c,
            PeripheralKind::Uart,
            PeripheralKind::Adc,
        ]
    }
}

impl fmt::Display for PeripheralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeripheralKind::Timer => "TIMER",
            PeripheralKind::Spi => "SPI",
            PeripheralKind::I2c => "I2C",
            PeripheralKind::Uart => "UART",
            PeripheralKind::Adc => "ADC",
        };
        f.write_str(s)
    }
}

/// A signal role on a serial bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Signal {
    SpiMosi,
    SpiMiso,
    SpiSclk,
    I2cScl,
    I2cSda,
    UartTx,
    UartRx,
}

impl Signal {
    /// The peripheral kind this signal belongs to.
    pub fn kind(&self) -> PeripheralKind {
        match self {
            Signal::SpiMosi | Signal::SpiMiso | Signal::SpiSclk => PeripheralKind::Spi,
            Signal::I2cScl | Signal::I2cSda => PeripheralKind::I2c,
            Signal::UartTx | Signal::UartRx => PeripheralKind::Uart,
        }
    }

    /// Short role label (`MOSI`, `SCL`, `TX`).
    pub fn label(&self) -> &'static str {
        match self {
            Signal::SpiMosi => "MOSI",
            Signal::SpiMiso => "MISO",
            Signal::SpiSclk => "SCLK",
            Signal::I2cScl => "SCL",
            Signal::I2cSda => "SDA",
            Signal::UartTx => "TX",
            Signal::UartRx => "RX",
        }
    }

    /// The full set of signals a complete bus of `kind` needs.
    pub fn required_for(kind: PeripheralKind) -> &'static [Signal] {
        match kind {
            PeripheralKind::Spi => &[Signal::SpiMosi, Signal::SpiMiso, Signal::SpiSclk],
            PeripheralKind::I2c => &[Signal::I2cScl, Signal::I2cSda],
            PeripheralKind::Uart => &[Signal::UartTx, Signal::UartRx],
            PeripheralKind::Timer | PeripheralKind::Adc => &[],
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind(), self.label())
    }
}

/// A named peripheral instance from a capability table (`TIM3`, `USART1`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeripheralInstance {
    name: String,
    prefix_len: usize,
    number: Option<u8>,
}

impl PeripheralInstance {
    /// Parse an instance name, splitting off its trailing number.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(CoreError::InvalidInstance {
                name: name.to_string(),
            });
        }
        let digits = name
            .bytes()
            .rev()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let prefix_len = name.len() - digits;
        if prefix_len == 0 {
            return Err(CoreError::InvalidInstance {
                name: name.to_string(),
            });
        }
        let number = name[prefix_len..].parse().ok();
        Ok(Self {
            name: name.to_string(),
            prefix_len,
            number,
        })
    }

    /// The full instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The alphabetic prefix (`TIM`, `USART`).
    pub fn prefix(&self) -> &str {
        &self.name[..self.prefix_len]
    }

    /// The trailing instance number, if any.
    pub fn number(&self) -> Option<u8> {
        self.number
    }

    /// Whether this instance is the one a selector asks for.
    pub fn matches(&self, selector: &InstanceSelector) -> bool {
        self.number == Some(selector.number)
            && selector.kind.instance_prefixes().contains(&self.prefix())
    }
}

impl fmt::Display for PeripheralInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for PeripheralInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// A request for a specific numbered instance of a peripheral kind.
///
/// `InstanceSelector { kind: Uart, number: 1 }` matches `USART1` or `UART1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct InstanceSelector {
    pub kind: PeripheralKind,
    pub number: u8,
}

impl InstanceSelector {
    pub fn new(kind: PeripheralKind, number: u8) -> Self {
        Self { kind, number }
    }

    /// Parse a selector value: either a bare number (`3`) or an instance
    /// name whose prefix belongs to `kind` (`SPI3`, `USART6`).
    pub fn parse_value(kind: PeripheralKind, value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(number) = value.parse::<u8>() {
            return (number > 0).then_some(Self { kind, number });
        }
        let instance = PeripheralInstance::parse(&value.to_ascii_uppercase()).ok()?;
        let number = instance.number()?;
        kind.instance_prefixes()
            .contains(&instance.prefix())
            .then_some(Self { kind, number })
    }
}

impl fmt::Display for InstanceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PeripheralKind::Timer => write!(f, "TIM{}", self.number),
            PeripheralKind::Uart => write!(f, "UART{}", self.number),
            other => write!(f, "{other}{}", self.number),
        }
    }
}
