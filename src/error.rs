use crate::command::error::ModemError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GenericError {
    Timeout,
    Unsupported,
    Overflow,
}

#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The command channel failed to deliver a command or its response
    Atat(atat::Error),

    /// The modem answered with a failure result code
    Modem(ModemError),

    // Generic shared errors, e.g. from `core::`
    Generic(GenericError),

    /// A response could not be decoded
    InvalidResponse,

    /// The operation was superseded by a deactivation
    Canceled,

    /// Another operation is still in flight
    Busy,

    /// The data transport went down before the context was up
    TransportFailed,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::Atat(e) => defmt::write!(f, "Atat({:?})", e),
            Self::Modem(e) => defmt::write!(f, "Modem({:?})", e),
            Self::Generic(e) => defmt::write!(f, "Generic({:?})", e),
            Self::InvalidResponse => defmt::write!(f, "InvalidResponse"),
            Self::Canceled => defmt::write!(f, "Canceled"),
            Self::Busy => defmt::write!(f, "Busy"),
            Self::TransportFailed => defmt::write!(f, "TransportFailed"),
        }
    }
}

impl From<atat::Error> for Error {
    fn from(e: atat::Error) -> Self {
        Self::Atat(e)
    }
}

impl From<ModemError> for Error {
    fn from(e: ModemError) -> Self {
        Self::Modem(e)
    }
}

impl From<GenericError> for Error {
    fn from(e: GenericError) -> Self {
        Self::Generic(e)
    }
}
