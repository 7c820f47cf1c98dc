//! Resource types named by board-definition `resource` statements.
//!
//! Board definitions use an open-ended set of resource keywords. The
//! resolver only reasons about three categories (bus pins, timer-bearing
//! outputs, single-purpose GPIO); every other keyword is kept as
//! [`ResourceType::Unmodeled`] and never takes part in variant resolution or
//! conflict detection.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::peripheral::Signal;

/// A family of timer-driven outputs sharing one output protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OutputFamily {
    Motor,
    Servo,
    LedStrip,
}

impl OutputFamily {
    /// Board-definition keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            OutputFamily::Motor => "MOTOR",
            OutputFamily::Servo => "SERVO",
            OutputFamily::LedStrip => "LED_STRIP",
        }
    }
}

/// A single-purpose GPIO role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GpioRole {
    FlashCs,
    GyroCs,
    GyroExti,
    SdcardCs,
    OsdCs,
    BaroCs,
    Led,
    Beeper,
    AdcBatt,
    AdcCurr,
    AdcRssi,
}

impl GpioRole {
    /// Board-definition keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            GpioRole::FlashCs => "FLASH_CS",
            GpioRole::GyroCs => "GYRO_CS",
            GpioRole::GyroExti => "GYRO_EXTI",
            GpioRole::SdcardCs => "SDCARD_CS",
            GpioRole::OsdCs => "OSD_CS",
            GpioRole::BaroCs => "BARO_CS",
            GpioRole::Led => "LED",
            GpioRole::Beeper => "BEEPER",
            GpioRole::AdcBatt => "ADC_BATT",
            GpioRole::AdcCurr => "ADC_CURR",
            GpioRole::AdcRssi => "ADC_RSSI",
        }
    }

    /// Whether the role needs an analog (ADC) capable pin.
    pub fn is_analog(&self) -> bool {
        matches!(self, GpioRole::AdcBatt | GpioRole::AdcCurr | GpioRole::AdcRssi)
    }
}

/// The category the resolver processes a resource under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCategory {
    BusPin,
    TimerOutput,
    Gpio,
    Unmodeled,
}

/// The type of a board-definition resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    Bus(Signal),
    Timer(OutputFamily),
    Gpio(GpioRole),
    /// Any keyword the resolver does not model, kept verbatim (uppercased).
    Unmodeled(String),
}

impl ResourceType {
    /// Classify a `resource` keyword. Unknown keywords become `Unmodeled`.
    pub fn from_keyword(keyword: &str) -> Self {
        let upper = keyword.to_ascii_uppercase();
        match upper.as_str() {
            "SPI_MOSI" => ResourceType::Bus(Signal::SpiMosi),
            "SPI_MISO" => ResourceType::Bus(Signal::SpiMiso),
            "SPI_SCK" | "SPI_SCLK" => ResourceType::Bus(Signal::SpiSclk),
            "I2C_SCL" => ResourceType::Bus(Signal::I2cScl),
            "I2C_SDA" => ResourceType::Bus(Signal::I2cSda),
            "SERIAL_TX" => ResourceType::Bus(Signal::UartTx),
            "SERIAL_RX" => ResourceType::Bus(Signal::UartRx),
            "MOTOR" => ResourceType::Timer(OutputFamily::Motor),
            "SERVO" => ResourceType::Timer(OutputFamily::Servo),
            "LED_STRIP" => ResourceType::Timer(OutputFamily::LedStrip),
            "FLASH_CS" => ResourceType::Gpio(GpioRole::FlashCs),
            "GYRO_CS" => ResourceType::Gpio(GpioRole::GyroCs),
            "GYRO_EXTI" => ResourceType::Gpio(GpioRole::GyroExti),
            "SDCARD_CS" => ResourceType::Gpio(GpioRole::SdcardCs),
            "OSD_CS" => ResourceType::Gpio(GpioRole::OsdCs),
            "BARO_CS" => ResourceType::Gpio(GpioRole::BaroCs),
            "LED" => ResourceType::Gpio(GpioRole::Led),
            "BEEPER" => ResourceType::Gpio(GpioRole::Beeper),
            "ADC_BATT" => ResourceType::Gpio(GpioRole::AdcBatt),
            "ADC_CURR" => ResourceType::Gpio(GpioRole::AdcCurr),
            "ADC_RSSI" => ResourceType::Gpio(GpioRole::AdcRssi),
            _ => ResourceType::Unmodeled(upper),
        }
    }

    /// The keyword this resource is written with in a board definition.
    pub fn keyword(&self) -> &str {
        match self {
            ResourceType::Bus(signal) => match signal {
                Signal::SpiMosi => "SPI_MOSI",
                Signal::SpiMiso => "SPI_MISO",
                Signal::SpiSclk => "SPI_SCK",
                Signal::I2cScl => "I2C_SCL",
                Signal::I2cSda => "I2C_SDA",
                Signal::UartTx => "SERIAL_TX",
                Signal::UartRx => "SERIAL_RX",
            },
            ResourceType::Timer(family) => family.keyword(),
            ResourceType::Gpio(role) => role.keyword(),
            ResourceType::Unmodeled(keyword) => keyword,
        }
    }

    /// Resolver category.
    pub fn category(&self) -> ResourceCategory {
        match self {
            ResourceType::Bus(_) => ResourceCategory::BusPin,
            ResourceType::Timer(_) => ResourceCategory::TimerOutput,
            ResourceType::Gpio(_) => ResourceCategory::Gpio,
            ResourceType::Unmodeled(_) => ResourceCategory::Unmodeled,
        }
    }

    /// Whether the resolver reasons about this resource at all.
    pub fn is_modeled(&self) -> bool {
        !matches!(self, ResourceType::Unmodeled(_))
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.keyword())
    }
}

/// Identity of one resource: type plus 1-based index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceRef {
    pub resource: ResourceType,
    pub index: u8,
}

impl ResourceRef {
    pub fn new(resource: ResourceType, index: u8) -> Self {
        Self { resource, index }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resource, self.index)
    }
}
