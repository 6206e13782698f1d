//! # Confirmation Gates Module
//!
//! Questo modulo astrae i due punti di conferma del run dietro un trait, così
//! l'orchestratore non dipende da stdin/stdout.
//!
//! ## Gate:
//! 1. **Candidati**: prima di qualsiasi scrittura, l'utente vede tutti gli
//!    oggetti trovati (key, formato, dimensione) e deve approvare
//! 2. **Cancellazione**: mostrato solo se almeno un oggetto è stato riscritto
//!    sotto una key diversa; approva la rimozione degli originali superati
//!
//! ## Implementazioni:
//! - `ConsolePrompt`: tabella + domanda `y/n` su terminale
//! - `AutoApprove`: approva sempre (`--yes`, modalità JSON)

use crate::locator::ImageObject;
use crate::report::{candidate_table, format_size};
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Decision capability supplied by the caller
pub trait Confirm: Send + Sync {
    /// Approve processing of the discovered candidates
    fn approve_candidates(&self, objects: &[ImageObject]) -> bool;

    /// Approve deletion of originals superseded by a rewrite under a new key
    fn approve_deletion(&self, keys: &[String]) -> bool;
}

/// Approves both gates without asking
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl Confirm for AutoApprove {
    fn approve_candidates(&self, _objects: &[ImageObject]) -> bool {
        true
    }

    fn approve_deletion(&self, _keys: &[String]) -> bool {
        true
    }
}

/// Interactive prompt on stdin/stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompt;

impl ConsolePrompt {
    fn prompt(question: &str) -> bool {
        let stdin = io::stdin();
        let stdout = io::stdout();
        match ask(question, &mut stdin.lock(), &mut stdout.lock()) {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Could not read confirmation: {}", e);
                false
            }
        }
    }
}

impl Confirm for ConsolePrompt {
    fn approve_candidates(&self, objects: &[ImageObject]) -> bool {
        let total: u64 = objects.iter().map(|o| o.original_size_bytes).sum();
        println!("\nThe following images will be processed:");
        println!("{}", candidate_table(objects).render());
        let question = format!(
            "\nProcess {} files, total {}? (y/n): ",
            objects.len(),
            format_size(total)
        );
        let approved = Self::prompt(&question);
        if !approved {
            println!("Operation cancelled by user");
        }
        approved
    }

    fn approve_deletion(&self, keys: &[String]) -> bool {
        println!("\nThe following originals were rewritten under a new key:");
        for key in keys {
            println!("  {}", key);
        }
        Self::prompt(&format!("\nDelete {} superseded originals? (y/n): ", keys.len()))
    }
}

/// Write `question`, read one line and accept only `y`/`yes` (any case).
///
/// End of input counts as a refusal.
pub fn ask(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    output.write_all(question.as_bytes())?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn answer(line: &str) -> bool {
        let mut output = Vec::new();
        ask("ok? ", &mut Cursor::new(line.as_bytes()), &mut output).unwrap()
    }

    #[test]
    fn test_ask_accepts_yes() {
        assert!(answer("y\n"));
        assert!(answer("Y\n"));
        assert!(answer("  yes \n"));
    }

    #[test]
    fn test_ask_rejects_everything_else() {
        assert!(!answer("n\n"));
        assert!(!answer("\n"));
        assert!(!answer("yep\n"));
        assert!(!answer(""));
    }

    #[test]
    fn test_ask_writes_question() {
        let mut output = Vec::new();
        ask("Continue? ", &mut Cursor::new(b"y\n".as_slice()), &mut output).unwrap();
        assert_eq!(output, b"Continue? ");
    }

    #[test]
    fn test_auto_approve() {
        let gate = AutoApprove;
        assert!(gate.approve_candidates(&[ImageObject::new("a/b/c.png", 1)]));
        assert!(gate.approve_deletion(&["a/b/c.png".to_string()]));
    }
}
