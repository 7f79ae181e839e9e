//! Prompt templates for the two tasks.

use crate::chunking::LogChunk;

/// System prompt for log analysis.
pub const DETECTIVE_SYSTEM_PROMPT: &str = "\
You are a log analyst. Your job is to find the patterns, anomalies and \
failures hidden in log files and turn them into concrete, evidence-backed \
conclusions.

You are good at:
- reading timestamps, error messages and system events for recurring patterns
- counting things: event frequencies, error rates, busy periods
- spotting outliers and behaviour that does not fit
- proposing root causes and performance bottlenecks

Every claim you make should point at the log lines that support it.";

/// System prompt for the ASCII art demonstration.
pub const ASCII_ART_SYSTEM_PROMPT: &str =
    "You are an experienced Python developer who writes small, self-contained single-file scripts.";

/// Where the model can find the chunk it is analysing.
#[derive(Debug, Clone, Copy)]
pub enum ChunkSource<'a> {
    /// Uploaded to the execution context under this file name
    Uploaded(&'a str),
    /// Upload failed; the content travels in the prompt
    Inline,
}

/// Task prompt for one chunk.
pub fn analysis_prompt(source_name: &str, chunk: &LogChunk, total: usize, location: ChunkSource<'_>) -> String {
    let mut prompt = String::new();

    match location {
        ChunkSource::Uploaded(remote) if total == 1 => prompt.push_str(&format!(
            "Analyse the log file '{remote}'. It has been uploaded to the working directory of your execution environment.\n"
        )),
        ChunkSource::Uploaded(remote) => prompt.push_str(&format!(
            "Analyse part {} of {total} of the log file '{source_name}' (lines {}-{}). \
             That part has been uploaded to the working directory of your execution environment as '{remote}'. \
             Report only on this part; the other parts are analysed separately.\n",
            chunk.index + 1,
            chunk.first_line,
            chunk.last_line
        )),
        ChunkSource::Inline => prompt.push_str(&format!(
            "Analyse the following excerpt of the log file '{source_name}' (part {} of {total}, lines {}-{}). \
             It could not be uploaded, so it is included below.\n\n<log>\n{}\n</log>\n",
            chunk.index + 1,
            chunk.first_line,
            chunk.last_line,
            chunk.content.trim_end()
        )),
    }

    if chunk.sampled {
        prompt.push_str(
            "\nThe file was too large to analyse whole. What you have is a sample: the beginning of the log, \
             every line that looks like an error or warning (as far as space allowed), and the end of the log.\n",
        );
    }
    if chunk.oversized {
        prompt.push_str("\nThis part is a single, very long log line.\n");
    }

    prompt.push_str(
        "
Cover:
1. Overview: size, time span, number of entries
2. Event types: what kinds of messages are logged
3. Errors: errors, warnings and failure patterns
4. Timeline: key events, busy periods, patterns over time
5. Anomalies: outliers and unexpected behaviour
6. Performance: response times, throughput, bottlenecks where the log shows them
7. Recommendations: specific next steps to investigate or fix

Use the tools to read and parse the file, run shell commands (grep, awk, sort, uniq, wc) \
and write small analysis scripts when that is faster than reading by eye. \
Finish with a written report that cites specific log lines.",
    );
    prompt
}

/// Task prompt for the ASCII art demonstration.
pub fn ascii_art_prompt(text: &str) -> String {
    format!(
        "Write a command-line program in `script.py` that prints its arguments (sys.argv[1:]) as ASCII art. \
         It must run as `python script.py <words>`.

Once written, run it with \"{text}\" as the argument. If it fails, fix it and run it again until it works.

When it works, read `script.py` back with the read tool and return its contents verbatim in a code block. \
In a second code block, give the verbatim output of the last run."
    )
}
