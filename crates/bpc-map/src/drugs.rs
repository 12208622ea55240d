//! Drug label to drug code lookup built from the drug slot choice strings.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::MappingCatalog;
use crate::choices::parse_choices;

/// Label to code table for the coded drug fields of one cohort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrugCodeMapper {
    codes: BTreeMap<String, String>,
}

impl DrugCodeMapper {
    /// Build the table from variable choice strings.
    ///
    /// Variables are visited in `variable_names` order; a variable missing from
    /// `mapping_rows` or with an empty choice string contributes nothing, and a
    /// label produced by a later variable overwrites the earlier code.
    pub fn parse<S>(mapping_rows: &BTreeMap<String, String>, variable_names: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        let mut codes = BTreeMap::new();
        for name in variable_names {
            let name = name.as_ref();
            let Some(choices) = mapping_rows.get(name) else {
                debug!(variable = name, "drug variable not in mapping");
                continue;
            };
            for entry in parse_choices(choices) {
                codes.insert(entry.label, entry.code);
            }
        }
        Self { codes }
    }

    /// Build the table for the fixed drug slot variables of a catalog.
    pub fn from_catalog(catalog: &MappingCatalog) -> Self {
        Self::parse(
            &catalog.choice_strings(),
            MappingCatalog::drug_variable_names(),
        )
    }

    /// Code for a drug label; untranslatable labels yield None.
    pub fn translate(&self, label: &str) -> Option<&str> {
        self.codes.get(label.trim()).map(String::as_str)
    }

    pub fn codes(&self) -> &BTreeMap<String, String> {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
