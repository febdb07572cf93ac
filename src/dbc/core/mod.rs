//! One decoder per DBC record kind.
//!
//! Every decoder starts on the record keyword, consumes the whole record and pushes
//! its content into [`Records`](crate::dbc::records::Records).

pub(crate) mod ba_;
pub(crate) mod ba_def_;
pub(crate) mod ba_def_def_;
pub(crate) mod ba_rel_;
pub(crate) mod bo_;
pub(crate) mod bo_tx_bu_;
pub(crate) mod bu_;
pub(crate) mod cm_;
pub(crate) mod ev_;
pub(crate) mod ns_;
pub(crate) mod sg_;
pub(crate) mod sg_mul_val_;
pub(crate) mod sig_group_;
pub(crate) mod sig_valtype_;
pub(crate) mod val_;
pub(crate) mod version;
