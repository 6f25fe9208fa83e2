//! JSON plan output.

use std::io::{self, Write};

use pmap_core::{PlanSink, PortProgrammingPlan};

/// Writes each applied plan as pretty-printed JSON.
pub struct JsonPlanWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonPlanWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PlanSink for JsonPlanWriter<W> {
    type Error = io::Error;

    fn apply(&mut self, plan: &PortProgrammingPlan) -> Result<(), io::Error> {
        serde_json::to_writer_pretty(&mut self.out, plan)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmap_core::{program_ports, LoaderConfig, MappingStore, RawPlatformMapping, ResolveRequest};
    use pmap_types::{PortId, ProfileId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_writes_plan_json() {
        let raw = RawPlatformMapping::from_json_str(&pmap_test::sample_mapping_json()).unwrap();
        let store = MappingStore::new(&raw, LoaderConfig::default()).unwrap();
        let mut writer = JsonPlanWriter::new(Vec::new());
        program_ports(
            &store.resolver(),
            &[ResolveRequest::new(PortId(1), ProfileId(22))],
            &mut writer,
        )
        .unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["port"], serde_json::json!(1));
        assert_eq!(value["subsumed_ports"], serde_json::json!([3]));
        assert_eq!(value["iphy_pins"][0]["pin"]["chip"], serde_json::json!("BC0"));
        assert_eq!(value["iphy_pins"][0]["tx_source"], serde_json::json!("default"));
        assert_eq!(value["effective_profile"]["fec"], serde_json::json!(528));
    }
}
