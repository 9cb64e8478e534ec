//! Service table checks.
//!
//! Service numbers are zero based: service n of the 3GPP tables is
//! index n - 1 here.

/// EF UST, one bit per service (3GPP TS 31.102 4.2.8).
pub fn ust_is_available(efust: &[u8], index: usize) -> bool {
    efust
        .get(index / 8)
        .is_some_and(|b| (b >> (index % 8)) & 1 == 1)
}

/// EF EST, one bit per service (3GPP TS 31.102 4.2.47).
pub fn est_is_active(efest: &[u8], index: usize) -> bool {
    efest
        .get(index / 8)
        .is_some_and(|b| (b >> (index % 8)) & 1 == 1)
}

/// EF SST "allocated" bit, two bits per service (3GPP TS 51.011 10.3.7).
pub fn sst_is_available(efsst: &[u8], index: usize) -> bool {
    efsst
        .get(index / 4)
        .is_some_and(|b| (b >> ((index % 4) * 2)) & 1 == 1)
}

/// EF SST "activated" bit.
pub fn sst_is_active(efsst: &[u8], index: usize) -> bool {
    efsst
        .get(index / 4)
        .is_some_and(|b| (b >> ((index % 4) * 2 + 1)) & 1 == 1)
}

/// CPHS information services: both allocated and activated. Only the first
/// two bytes carry services.
pub fn cphs_is_active(cphs: &[u8], index: usize) -> bool {
    if index >= 8 {
        return false;
    }
    cphs.get(index / 4)
        .is_some_and(|b| (b >> ((index % 4) * 2)) & 3 == 3)
}
