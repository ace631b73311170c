use super::MetricSpec;
use core::fmt;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered collection of metric collectors destined for the
/// `plugins.CommandExecutor.metrics` section of the suite config.
///
/// Serializes as a YAML mapping whose entry order is the catalog order;
/// deserializing preserves whatever order the document carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsDocument {
    entries: Vec<(String, MetricSpec)>,
}

impl MetricsDocument {
    pub(crate) fn push(&mut self, id: String, spec: MetricSpec) {
        self.entries.push((id, spec));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricSpec)> {
        self.entries.iter().map(|(id, spec)| (id.as_str(), spec))
    }

    pub fn metric_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MetricSpec> {
        self.entries.iter().find(|(entry_id, _)| entry_id == id).map(|(_, spec)| spec)
    }
}

impl Serialize for MetricsDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, spec) in &self.entries {
            map.serialize_entry(id, spec)?;
        }
        map.end()
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = MetricsDocument;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of metric ids to metric specs")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut document = MetricsDocument::default();
        while let Some((id, spec)) = access.next_entry::<String, MetricSpec>()? {
            document.push(id, spec);
        }

        Ok(document)
    }
}

impl<'de> Deserialize<'de> for MetricsDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DocumentVisitor)
    }
}
