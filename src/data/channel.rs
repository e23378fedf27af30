use super::model::ScanTable;
use crate::error::{ReconError, Result};

/// Detector elements summed when an element has no channel of its own.
pub const DEFAULT_ROI_DETECTORS: [u32; 3] = [1, 2, 3];

/// Name of one detector's region-of-interest channel for an element.
pub fn roi_channel_name(detector: u32, element: &str) -> String {
    format!("Det{detector}_{element}")
}

// ---------------------------------------------------------------------------
// ChannelSelector – which columns make up the signal
// ---------------------------------------------------------------------------

/// Signal source, decided once against a table's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    Direct(String),
    SummedRoi(Vec<String>),
}

impl ChannelSelector {
    /// Use `element` directly when the table has it, otherwise sum the
    /// per-detector ROI channels for it. With no detectors to sum, the
    /// element itself is the only candidate.
    pub fn resolve(table: &ScanTable, element: &str, detectors: &[u32]) -> Self {
        if table.contains(element) || detectors.is_empty() {
            ChannelSelector::Direct(element.to_string())
        } else {
            ChannelSelector::SummedRoi(
                detectors
                    .iter()
                    .map(|&det| roi_channel_name(det, element))
                    .collect(),
            )
        }
    }

    /// Every column this selector reads.
    pub fn channel_names(&self) -> Vec<&str> {
        match self {
            ChannelSelector::Direct(name) => vec![name.as_str()],
            ChannelSelector::SummedRoi(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Extract the spectrum from `table`.
    ///
    /// A summed selector requires all of its components; every missing one
    /// is reported, nothing is partially summed.
    pub fn spectrum(&self, table: &ScanTable) -> Result<Vec<f64>> {
        match self {
            ChannelSelector::Direct(name) => Ok(table.numeric(name)?.to_vec()),
            ChannelSelector::SummedRoi(names) => {
                let missing: Vec<String> = names
                    .iter()
                    .filter(|name| !table.contains(name))
                    .cloned()
                    .collect();
                if !missing.is_empty() || names.is_empty() {
                    return Err(ReconError::MissingChannel { attempted: missing });
                }

                let mut total = vec![0.0; table.len()];
                for name in names {
                    for (acc, v) in total.iter_mut().zip(table.numeric(name)?) {
                        *acc += v;
                    }
                }
                Ok(total)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;
    use std::collections::BTreeMap;

    fn table(cols: &[(&str, Vec<f64>)]) -> ScanTable {
        let map: BTreeMap<String, Column> = cols
            .iter()
            .map(|(name, values)| (name.to_string(), Column::Numeric(values.clone())))
            .collect();
        ScanTable::from_columns(map).unwrap()
    }

    #[test]
    fn direct_channel_is_preferred() {
        let t = table(&[
            ("Pt", vec![1.0, 2.0]),
            ("Det1_Pt", vec![10.0, 10.0]),
        ]);
        let sel = ChannelSelector::resolve(&t, "Pt", &DEFAULT_ROI_DETECTORS);
        assert_eq!(sel, ChannelSelector::Direct("Pt".into()));
        assert_eq!(sel.spectrum(&t).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn roi_channels_are_summed() {
        let t = table(&[
            ("Det1_Fe", vec![1.0, 2.0, 3.0]),
            ("Det2_Fe", vec![10.0, 20.0, 30.0]),
            ("Det3_Fe", vec![100.0, 200.0, 300.0]),
        ]);
        let sel = ChannelSelector::resolve(&t, "Fe", &DEFAULT_ROI_DETECTORS);
        assert_eq!(sel.channel_names(), vec!["Det1_Fe", "Det2_Fe", "Det3_Fe"]);
        assert_eq!(sel.spectrum(&t).unwrap(), vec![111.0, 222.0, 333.0]);
    }

    #[test]
    fn no_detectors_reports_the_element() {
        let t = table(&[("Det1_Fe", vec![1.0])]);
        let sel = ChannelSelector::resolve(&t, "Fe", &[]);
        assert_eq!(sel, ChannelSelector::Direct("Fe".into()));
        match sel.spectrum(&t) {
            Err(ReconError::MissingChannel { attempted }) => {
                assert_eq!(attempted, vec!["Fe".to_string()]);
            }
            other => panic!("expected MissingChannel, got {other:?}"),
        }
    }

    #[test]
    fn missing_roi_component_lists_every_absent_name() {
        let t = table(&[("Det2_Fe", vec![1.0])]);
        let sel = ChannelSelector::resolve(&t, "Fe", &DEFAULT_ROI_DETECTORS);
        match sel.spectrum(&t) {
            Err(ReconError::MissingChannel { attempted }) => {
                assert_eq!(attempted, vec!["Det1_Fe".to_string(), "Det3_Fe".to_string()]);
            }
            other => panic!("expected MissingChannel, got {other:?}"),
        }
    }
}
