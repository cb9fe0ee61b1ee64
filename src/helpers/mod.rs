//! Low-level helpers shared by the workbook reader: zip part access,
//! streaming XML and A1-style cell references.
pub(crate) mod reference;
pub(crate) mod xml;
pub(crate) mod zip;
