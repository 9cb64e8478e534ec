use core::str::FromStr;

/// Final result code of a failed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemError {
    /// Plain `ERROR`, `NO CARRIER` and anything else without a code
    Generic,
    Cme(CmeError),
    /// Message service failure, 27.005 3.2.5
    Cms(u16),
}

impl FromStr for ModemError {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if let Some(err) = s.strip_prefix("+CME ERROR:") {
            Self::Cme(err.parse().unwrap_or(CmeError::Unknown))
        } else if let Some(err) = s.strip_prefix("+CMS ERROR:") {
            // 500: unknown error
            Self::Cms(err.trim().parse().unwrap_or(500))
        } else {
            Self::Generic
        })
    }
}

/// Mobile termination error result codes +CME ERROR (3GPP TS 27.007 9.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CmeError {
    PhoneFailure,
    NoConnectionToPhone,
    PhoneAdaptorLinkReserved,
    OperationNotAllowed,
    OperationNotSupported,
    PhSimPinRequired,
    PhFsimPinRequired,
    PhFsimPukRequired,
    SimNotInserted,
    SimPinRequired,
    SimPukRequired,
    SimFailure,
    SimBusy,
    SimWrong,
    IncorrectPassword,
    SimPin2Required,
    SimPuk2Required,
    MemoryFull,
    InvalidIndex,
    NotFound,
    MemoryFailure,
    TextStringTooLong,
    InvalidCharactersInTextString,
    DialStringTooLong,
    InvalidCharactersInDialString,
    NoNetworkService,
    NetworkTimeout,
    EmergencyCallsOnly,
    NetworkPersonalizationPinRequired,
    NetworkPersonalizationPukRequired,
    NetworkSubsetPersonalizationPinRequired,
    NetworkSubsetPersonalizationPukRequired,
    ServiceProviderPersonalizationPinRequired,
    ServiceProviderPersonalizationPukRequired,
    CorporatePersonalizationPinRequired,
    CorporatePersonalizationPukRequired,
    HiddenKeyRequired,
    EapMethodNotSupported,
    IncorrectParameters,

    // GPRS and EPS related
    Unknown,
    IllegalMs,
    IllegalMe,
    GprsServicesNotAllowed,
    PlmnNotAllowed,
    LocationAreaNotAllowed,
    RoamingNotAllowed,
    ServiceOptionNotSupported,
    ServiceOptionNotSubscribed,
    ServiceOptionOutOfOrder,
    UnspecifiedGprsError,
    PdpAuthenticationFailure,
    InvalidMobileClass,
    LastPdnDisconnectionNotAllowed,
    SemanticallyIncorrectMessage,
    MandatoryIeError,
    IeNonExistent,
    ConditionalIeError,
    ProtocolErrorUnspecified,
    OperatorDeterminedBarring,
}

const CME_ERRORS: &[(u16, &str, CmeError)] = &[
    (0, "phone failure", CmeError::PhoneFailure),
    (1, "no connection to phone", CmeError::NoConnectionToPhone),
    (2, "phone-adaptor link reserved", CmeError::PhoneAdaptorLinkReserved),
    (3, "operation not allowed", CmeError::OperationNotAllowed),
    (4, "operation not supported", CmeError::OperationNotSupported),
    (5, "ph-sim pin required", CmeError::PhSimPinRequired),
    (6, "ph-fsim pin required", CmeError::PhFsimPinRequired),
    (7, "ph-fsim puk required", CmeError::PhFsimPukRequired),
    (10, "sim not inserted", CmeError::SimNotInserted),
    (11, "sim pin required", CmeError::SimPinRequired),
    (12, "sim puk required", CmeError::SimPukRequired),
    (13, "sim failure", CmeError::SimFailure),
    (14, "sim busy", CmeError::SimBusy),
    (15, "sim wrong", CmeError::SimWrong),
    (16, "incorrect password", CmeError::IncorrectPassword),
    (17, "sim pin2 required", CmeError::SimPin2Required),
    (18, "sim puk2 required", CmeError::SimPuk2Required),
    (20, "memory full", CmeError::MemoryFull),
    (21, "invalid index", CmeError::InvalidIndex),
    (22, "not found", CmeError::NotFound),
    (23, "memory failure", CmeError::MemoryFailure),
    (24, "text string too long", CmeError::TextStringTooLong),
    (25, "invalid characters in text string", CmeError::InvalidCharactersInTextString),
    (26, "dial string too long", CmeError::DialStringTooLong),
    (27, "invalid characters in dial string", CmeError::InvalidCharactersInDialString),
    (30, "no network service", CmeError::NoNetworkService),
    (31, "network timeout", CmeError::NetworkTimeout),
    (32, "network not allowed - emergency calls only", CmeError::EmergencyCallsOnly),
    (40, "network personalization pin required", CmeError::NetworkPersonalizationPinRequired),
    (41, "network personalization puk required", CmeError::NetworkPersonalizationPukRequired),
    (
        42,
        "network subset personalization pin required",
        CmeError::NetworkSubsetPersonalizationPinRequired,
    ),
    (
        43,
        "network subset personalization puk required",
        CmeError::NetworkSubsetPersonalizationPukRequired,
    ),
    (
        44,
        "service provider personalization pin required",
        CmeError::ServiceProviderPersonalizationPinRequired,
    ),
    (
        45,
        "service provider personalization puk required",
        CmeError::ServiceProviderPersonalizationPukRequired,
    ),
    (46, "corporate personalization pin required", CmeError::CorporatePersonalizationPinRequired),
    (47, "corporate personalization puk required", CmeError::CorporatePersonalizationPukRequired),
    (48, "hidden key required", CmeError::HiddenKeyRequired),
    (49, "eap method not supported", CmeError::EapMethodNotSupported),
    (50, "incorrect parameters", CmeError::IncorrectParameters),
    (100, "unknown", CmeError::Unknown),
    (103, "illegal ms", CmeError::IllegalMs),
    (106, "illegal me", CmeError::IllegalMe),
    (107, "gprs services not allowed", CmeError::GprsServicesNotAllowed),
    (111, "plmn not allowed", CmeError::PlmnNotAllowed),
    (112, "location area not allowed", CmeError::LocationAreaNotAllowed),
    (113, "roaming not allowed in this location area", CmeError::RoamingNotAllowed),
    (132, "service option not supported", CmeError::ServiceOptionNotSupported),
    (133, "requested service option not subscribed", CmeError::ServiceOptionNotSubscribed),
    (134, "service option temporarily out of order", CmeError::ServiceOptionOutOfOrder),
    (148, "unspecified gprs error", CmeError::UnspecifiedGprsError),
    (149, "pdp authentication failure", CmeError::PdpAuthenticationFailure),
    (150, "invalid mobile class", CmeError::InvalidMobileClass),
    (171, "last pdn disconnection not allowed", CmeError::LastPdnDisconnectionNotAllowed),
    (172, "semantically incorrect message", CmeError::SemanticallyIncorrectMessage),
    (173, "mandatory information element error", CmeError::MandatoryIeError),
    (174, "information element non-existent", CmeError::IeNonExistent),
    (175, "conditional ie error", CmeError::ConditionalIeError),
    (176, "protocol error, unspecified", CmeError::ProtocolErrorUnspecified),
    (177, "operator determined barring", CmeError::OperatorDeterminedBarring),
];

impl CmeError {
    /// Numeric code as reported with `AT+CMEE=1`.
    pub fn code(self) -> u16 {
        CME_ERRORS
            .iter()
            .find(|(_, _, err)| *err == self)
            .map_or(100, |(code, _, _)| *code)
    }
}

impl FromStr for CmeError {
    type Err = ();

    /// Accepts both the numeric (`AT+CMEE=1`) and the verbose
    /// (`AT+CMEE=2`) form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let entry = match s.parse::<u16>() {
            Ok(code) => CME_ERRORS.iter().find(|(c, _, _)| *c == code),
            Err(_) => CME_ERRORS
                .iter()
                .find(|(_, text, _)| text.eq_ignore_ascii_case(s)),
        };

        entry.map(|(_, _, err)| *err).ok_or(())
    }
}
