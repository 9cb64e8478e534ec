//! SIM file system codecs: TLV objects, the elementary file database,
//! operator names and authentication.

pub mod app;
pub mod auth;
pub mod ef;
pub mod eons;
pub mod number;
pub mod plmn;
pub mod service;
pub mod text;
pub mod tlv;
