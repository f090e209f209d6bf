use std::borrow::Cow;
use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Instant;

use minilisp::cli::{Options, USAGE, VERSION};
use minilisp::{Environment, Error, TokenKind, evaluate, evaluator, parse_str, tokenize};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

struct LispCompleter {
    env: Rc<RefCell<Environment>>,
}

impl LispCompleter {
    fn new(env: Rc<RefCell<Environment>>) -> Self {
        LispCompleter { env }
    }
}

impl rustyline::completion::Completer for LispCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let prefix = match tokenize(&line[..pos]).pop() {
            Some(token) if token.span.end == pos => match token.kind {
                TokenKind::Atom(prefix) => prefix,
                _ => return Ok((pos, vec![])),
            },
            _ => return Ok((pos, vec![])),
        };
        let mut candidates: Vec<String> = self
            .env
            .borrow()
            .get_identifiers()
            .union(&evaluator::special_form_identifiers())
            .filter_map(|id| id.strip_prefix(prefix.as_str()).map(str::to_string))
            .filter(|rest| !rest.is_empty())
            .collect();
        candidates.sort();
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct ReplHelper {
    #[rustyline(Validator)]
    validator: ParenValidator,
    #[rustyline(Highlighter)]
    highlighter: ParenHighlighter,
    #[rustyline(Completer)]
    completer: LispCompleter,
}

/// Keeps reading lines until every `(` is closed.
struct ParenValidator;

impl Validator for ParenValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth = 0usize;
        for (i, c) in ctx.input().char_indices() {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    return Ok(ValidationResult::Invalid(Some(format!(
                        "  - Unmatched ')' at position {}",
                        i
                    ))));
                }
                ')' => depth -= 1,
                _ => {}
            }
        }

        if depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// Bolds the pair of parentheses next to the cursor and marks unmatched ones red.
struct ParenHighlighter;

impl Highlighter for ParenHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let mut stack = Vec::new();
        let mut pairs = Vec::new();
        let mut unmatched = Vec::new();
        for (i, c) in line.char_indices() {
            match c {
                '(' => stack.push(i),
                ')' => match stack.pop() {
                    Some(open) => pairs.push((open, i)),
                    None => unmatched.push(i),
                },
                _ => {}
            }
        }
        unmatched.extend(stack);

        let touches_cursor = |i: usize| i == pos || i + 1 == pos;
        let active = pairs
            .into_iter()
            .find(|&(open, close)| touches_cursor(open) || touches_cursor(close));
        if unmatched.is_empty() && active.is_none() {
            return Cow::Borrowed(line);
        }

        let mut highlighted = String::with_capacity(line.len());
        for (i, c) in line.char_indices() {
            if unmatched.contains(&i) {
                highlighted.push_str(&format!("\x1b[1;31m{}\x1b[0m", c)); // Red for unmatched
            } else if active.is_some_and(|(open, close)| i == open || i == close) {
                highlighted.push_str(&format!("\x1b[1;34m{}\x1b[0m", c)); // Blue for the active pair
            } else {
                highlighted.push(c);
            }
        }
        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn report(err: Error, input: &str) {
    if err.pretty_print(input).is_err() {
        eprintln!("{}", err);
    }
}

/// A failed history write is logged; the session carries on.
fn history_entry_added(result: rustyline::Result<bool>) -> bool {
    result.unwrap_or_else(|err| {
        log::warn!("could not add history entry: {}", err);
        false
    })
}

fn run(options: &Options) -> rustyline::Result<()> {
    println!("{}", VERSION);
    println!("Type 'exit' or press Ctrl-D to quit.");

    let global_env = Environment::new_global_populated();
    let h = ReplHelper {
        highlighter: ParenHighlighter,
        validator: ParenValidator,
        completer: LispCompleter::new(global_env.clone()),
    };
    let edit_mode = if options.vi_mode {
        rustyline::EditMode::Vi
    } else {
        rustyline::EditMode::Emacs
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(edit_mode)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(&options.history_file).is_err() {
        log::info!("no history at {}", options.history_file.display());
    }

    loop {
        match rl.readline("minilisp> ") {
            Ok(line) => {
                history_entry_added(rl.add_history_entry(line.as_str()));
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }

                let node = match parse_str(input) {
                    Ok(node) => node,
                    Err(parse_err) => {
                        report(parse_err.into(), input);
                        continue;
                    }
                };
                let start = Instant::now();
                let result = evaluate(&node, &global_env);
                let elapsed = start.elapsed();
                match result {
                    Ok(value) => println!("{}", value),
                    Err(eval_err) => report(eval_err.into(), input),
                }
                if options.profile {
                    println!("Execution took {:?}", elapsed);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(&options.history_file)
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{}\n\n{}", err, USAGE);
            return ExitCode::from(2);
        }
    };
    if options.show_version {
        println!("{}", VERSION);
        return ExitCode::SUCCESS;
    }
    if options.show_help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Readline Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_failures_do_not_end_the_session() {
        assert!(history_entry_added(Ok(true)));
        assert!(!history_entry_added(Ok(false)));
        assert!(!history_entry_added(Err(ReadlineError::Eof)));
    }

    #[test]
    fn test_paren_highlighting() {
        let highlight = |line: &str| ParenHighlighter.highlight(line, line.len()).into_owned();
        assert_eq!(highlight("a"), "a");
        assert_eq!(highlight("(a b"), "\x1b[1;31m(\x1b[0ma b");
        assert_eq!(highlight("(a)"), "\x1b[1;34m(\x1b[0ma\x1b[1;34m)\x1b[0m");
    }
}
