//! Write-only output of registered fields.
//!
//! The solver registers its fields once, then hands the exporter a frame of
//! named values at every accepted time. Formats are up to implementors;
//! [`MemoryExporter`] keeps the snapshots in memory.

use std::collections::BTreeMap;

use crate::data::field_map::FieldMap;
use crate::fsi_error::FsiError;

/// Values of the registered fields at one time, by field name.
pub type ExportFrame<'a> = [(&'a str, &'a [f64])];

pub trait Exporter {
    fn add_field(&mut self, name: &str, map: &FieldMap) -> Result<(), FsiError>;

    fn post_process(&mut self, time: f64, frame: &ExportFrame<'_>) -> Result<(), FsiError>;

    fn close(&mut self) -> Result<(), FsiError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    pub fields: BTreeMap<String, Vec<f64>>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryExporter {
    sizes: BTreeMap<String, usize>,
    snapshots: Vec<Snapshot>,
    closed: bool,
}

fn export_error(message: String) -> FsiError {
    FsiError::InvalidConfig(format!("exporter: {message}"))
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.sizes.keys().map(String::as_str)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Exporter for MemoryExporter {
    fn add_field(&mut self, name: &str, map: &FieldMap) -> Result<(), FsiError> {
        if self.closed {
            return Err(export_error(format!("field '{name}' added after close")));
        }
        if self.sizes.insert(name.to_owned(), map.global_size()).is_some() {
            return Err(export_error(format!("field '{name}' registered twice")));
        }
        Ok(())
    }

    fn post_process(&mut self, time: f64, frame: &ExportFrame<'_>) -> Result<(), FsiError> {
        if self.closed {
            return Err(export_error(format!("post-process at t = {time} after close")));
        }
        let mut fields = BTreeMap::new();
        for &(name, values) in frame {
            let &size = self
                .sizes
                .get(name)
                .ok_or_else(|| export_error(format!("unregistered field '{name}'")))?;
            if values.len() != size {
                return Err(FsiError::LengthMismatch {
                    what: "exported field",
                    expected: size,
                    found: values.len(),
                });
            }
            fields.insert(name.to_owned(), values.to_vec());
        }
        if let Some(missing) = self.sizes.keys().find(|k| !fields.contains_key(*k)) {
            return Err(export_error(format!("field '{missing}' missing at t = {time}")));
        }
        self.snapshots.push(Snapshot { time, fields });
        Ok(())
    }

    fn close(&mut self) -> Result<(), FsiError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_complete_frames() {
        let mut exp = MemoryExporter::new();
        exp.add_field("velocity", &FieldMap::serial(2)).unwrap();
        exp.add_field("pressure", &FieldMap::serial(1)).unwrap();
        exp.post_process(0.0, &[("velocity", &[1.0, 2.0]), ("pressure", &[3.0])])
            .unwrap();
        assert_eq!(exp.snapshots().len(), 1);
        assert_eq!(exp.snapshots()[0].fields["pressure"], vec![3.0]);

        assert!(exp.post_process(1.0, &[("velocity", &[1.0, 2.0])]).is_err());
        assert!(exp.post_process(1.0, &[("velocity", &[1.0]), ("pressure", &[3.0])]).is_err());
        exp.close().unwrap();
        assert!(exp.post_process(2.0, &[]).is_err());
    }
}
