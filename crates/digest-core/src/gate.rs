//! Requires-processing gate shared by costly downstream plugins

use crate::record::Record;
use std::collections::BTreeSet;

/// Decide whether `record` still needs work from the plugin named `own_name`.
///
/// The first keyword-filter slot (in slot-name order) written by a different
/// plugin decides:
/// - any interested topic in its `ignorance` skips the record,
/// - otherwise any interested topic in its `keywords` processes it,
/// - otherwise the record is skipped.
///
/// Without an upstream keyword filter every record is processed. An empty
/// `interested` set stands for "whatever the upstream filter detected", so a
/// record passes when it has at least one detected keyword that was not ignored.
pub fn requires_processing(record: &Record, own_name: &str, interested: &BTreeSet<String>) -> bool {
    let upstream = record
        .slots()
        .filter(|slot| slot.plugin_name != own_name)
        .find_map(|slot| slot.keywords_filter());

    let Some(filter) = upstream else {
        return true;
    };

    let ignorance: BTreeSet<&str> = filter.ignorance.iter().map(String::as_str).collect();
    let detected: BTreeSet<&str> = filter.keywords.iter().map(String::as_str).collect();

    if interested.is_empty() {
        return detected.iter().any(|k| !ignorance.contains(k));
    }
    if interested.iter().any(|k| ignorance.contains(k.as_str())) {
        return false;
    }
    interested.iter().any(|k| detected.contains(k.as_str()))
}
