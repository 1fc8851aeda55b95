pub mod opc;

pub use opc::{CoreProperties, OpcPackage};
