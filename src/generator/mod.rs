//! Model → XML generators.
//!
//! - [`plcopen_xml`] – PLCopen TC6 XML text from a [`PlcopenProject`](crate::model::PlcopenProject).

pub mod plcopen_xml;

pub use plcopen_xml::{PLCOPEN_NAMESPACE, serialize_plcopen_project};
