// vfst-lookup: shared pieces of the lookup command.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Context;
use vfst::{Configuration, LookupOptions, Transducer};

/// Environment variable consulted when no transducer path is given.
pub const TRANSDUCER_ENV: &str = "VFST_PATH";

/// Loads the transducer at `path`, attaching the path to any error.
pub fn load_transducer(path: &Path) -> anyhow::Result<Transducer> {
    let transducer = Transducer::load(path)
        .with_context(|| format!("failed to load transducer {}", path.display()))?;
    log::info!(
        "loaded {}: {} symbols, {} flag features{}",
        path.display(),
        transducer.symbols().symbol_count(),
        transducer.flag_feature_count(),
        if transducer.is_byte_swapped() {
            ", byte-swapped"
        } else {
            ""
        }
    );
    Ok(transducer)
}

/// Looks up one word and writes its outputs, one per line, tab-separated
/// from the word. Words without outputs get a `+?` line.
///
/// Returns the number of outputs written.
pub fn write_lookup<W: Write>(
    out: &mut W,
    transducer: &Transducer,
    config: &mut Configuration,
    word: &str,
    options: &LookupOptions,
) -> anyhow::Result<usize> {
    let mut count = 0;
    for output in transducer.analyses(config, word, options) {
        match output {
            Ok(output) => {
                writeln!(out, "{word}\t{output}")?;
                count += 1;
            }
            Err(err) => {
                log::warn!("lookup of {word:?} stopped: {err}");
                break;
            }
        }
    }
    if count == 0 {
        writeln!(out, "{word}\t+?")?;
    }
    writeln!(out)?;
    Ok(count)
}

/// Runs every word of `words`, or every non-empty stdin line when `words` is
/// empty.
pub fn run<W: Write>(
    out: &mut W,
    transducer: &Transducer,
    words: &[String],
    options: &LookupOptions,
) -> anyhow::Result<()> {
    let mut config = transducer.new_config(options.stack_capacity);
    if words.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("error reading stdin")?;
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            write_lookup(out, transducer, &mut config, word, options)?;
        }
    } else {
        for word in words {
            write_lookup(out, transducer, &mut config, word, options)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfst::format::{COOKIE1, COOKIE2, HEADER_SIZE, align_to_transition};
    use vfst::transition::{FINAL_SYM, Transition};

    /// Accepts "ab" with output "xy".
    fn image() -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(&COOKIE1.to_le_bytes());
        data[4..8].copy_from_slice(&COOKIE2.to_le_bytes());
        data.extend_from_slice(&5u16.to_le_bytes());
        for sym in ["", "a", "b", "x", "y"] {
            data.extend_from_slice(sym.as_bytes());
            data.push(0);
        }
        data.resize(align_to_transition(data.len()), 0);
        for t in [
            Transition::new(1, 3, 1, 0),
            Transition::new(2, 4, 2, 0),
            Transition::new(FINAL_SYM, 0, 0, 0),
        ] {
            data.extend_from_slice(&t.to_le_bytes());
        }
        data
    }

    #[test]
    fn lookup_output_format() {
        let fst = Transducer::from_bytes(&image()).unwrap();
        let options = LookupOptions::default();
        let mut out = Vec::new();
        let words = vec!["ab".to_string(), "ba".to_string()];
        run(&mut out, &fst, &words, &options).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ab\txy\n\nba\t+?\n\n");
    }

    #[test]
    fn load_error_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.vfst");
        let err = load_transducer(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing.vfst"));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ab.vfst");
        std::fs::write(&path, image()).unwrap();
        let fst = load_transducer(&path).unwrap();
        let mut config = fst.new_config(100);
        let mut out = Vec::new();
        let count =
            write_lookup(&mut out, &fst, &mut config, "ab", &LookupOptions::default()).unwrap();
        assert_eq!(count, 1);
    }
}
