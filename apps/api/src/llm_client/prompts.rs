#![allow(dead_code)]

// Shared prompt fragments for the enrichment hook's four LLM calls.
// Each fragment instructs the model to return a bare numbered list so
// `parse_numbered_list` can extract it without a JSON round-trip.

pub const CONNECTION_SYSTEM: &str = "You are a creative ideation assistant. \
    Write exactly one short paragraph explaining the connection between two \
    domains for the given project. Respond with the paragraph only — no \
    preamble, no markdown, no quotation marks.";

pub const QUESTIONS_SYSTEM: &str = "You are a creative ideation assistant. \
    Produce exactly 4 thought-provoking questions that help the reader apply \
    the given domain's principles to their project. Respond as a numbered \
    list (1. ... 4.) with nothing else.";

pub const EXAMPLES_SYSTEM: &str = "You are a creative ideation assistant. \
    Produce exactly 3 concrete, adapted examples of the given domain's \
    principles applied to the reader's project. Respond as a numbered list \
    (1. ... 3.) with nothing else.";

pub const NEXT_STEPS_SYSTEM: &str = "You are a creative ideation assistant. \
    Produce exactly 4 concrete next steps the reader could take to apply the \
    given domain's principles to their project. Respond as a numbered list \
    (1. ... 4.) with nothing else.";
