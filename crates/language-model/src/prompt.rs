//! Prompt templates

use paper_digest_core::Record;

/// Marker a classification answer must contain to count as a match
pub const RESULT_MARKER: &str = "**RESULT: TRUE**";

const CLASSIFY_TEMPLATE: &str = "# Task Description
You are given a research paper's title and abstract as inputs. Your task is to determine whether the paper is falling into the interested topic.

# Task Requirements
- Please first provide a clear analysis based on the title and abstract;
- You shouldn't try to guess the content not appear in the provided text;
- If the paper is related to the interested topic, return **RESULT: TRUE**;
- If the paper is related to the discarded topic, return **RESULT: FALSE**, even if the paper is also related to the interested topic;
- If the paper does not fall into the interested scope, return **RESULT: FALSE**;

# Task Input
## Interested Topic
{interested}

## Discarded Topic
{discarded}

## Title
{title}

## Abstract
{abstract}";

const TRANSLATE_TEMPLATE: &str = "Translate the following abstract of a research paper into {language}. \
Reply with the translation only.

{abstract}";

/// Classification prompt for one record and topic
pub fn classification_prompt(record: &Record, interested: &str, discarded: &str) -> String {
    fill(
        CLASSIFY_TEMPLATE,
        &[
            ("interested", interested),
            ("discarded", discarded),
            ("title", record.title.as_str()),
            ("abstract", record.summary.as_str()),
        ],
    )
}

/// Translation prompt for a record's abstract
pub fn translation_prompt(record: &Record, language: &str) -> String {
    fill(
        TRANSLATE_TEMPLATE,
        &[("language", language), ("abstract", record.summary.as_str())],
    )
}

/// Substitute `{name}` placeholders of the template in one pass.
///
/// Substituted text is never scanned again, so braces inside paper text stay
/// as they are. Unknown placeholders are kept verbatim.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Whether a classification answer accepts the topic
pub fn is_accepted(response: &str) -> bool {
    response.contains(RESULT_MARKER)
}
