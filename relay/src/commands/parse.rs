//! Parsing of `shift <sub> ...` command text.

use shift_core::ValidationError;

const SET_USAGE: &str = "shift set <source> <target> [options...]";
const BACKUP_USAGE: &str = "shift backup <source> <target> [options...]";
const DEL_USAGE: &str = "shift del <index>[,<index>...]";
const PAUSE_USAGE: &str = "shift pause <index>[,<index>...]";
const RESUME_USAGE: &str = "shift resume <index>[,<index>...]";
const FILTER_USAGE: &str = "shift filter add|del <index>[,<index>...] <keyword...> | shift filter list <index>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    Add,
    Del,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShiftCommand {
    Help,
    Set {
        source: String,
        target: String,
        options: Vec<String>,
    },
    Backup {
        source: String,
        target: String,
        options: Vec<String>,
    },
    Delete {
        indices: String,
    },
    List,
    Stats,
    Pause {
        indices: String,
    },
    Resume {
        indices: String,
    },
    Filter {
        action: FilterAction,
        indices: String,
        keywords: Vec<String>,
    },
    FilterList {
        index: String,
    },
}

/// Parses `text` if it starts with the command word (`shift`, `/shift` or `/shift@botname`).
/// Returns `None` for ordinary messages.
pub fn parse_command(text: &str, prefix: &str) -> Option<Result<ShiftCommand, ValidationError>> {
    let mut tokens = text.split_whitespace();
    let head = tokens.next()?;
    let head = head.strip_prefix('/').unwrap_or(head);
    let head = head.split('@').next().unwrap_or(head);
    if head != prefix {
        return None;
    }
    let args: Vec<&str> = tokens.collect();
    Some(parse_args(&args))
}

fn parse_args(args: &[&str]) -> Result<ShiftCommand, ValidationError> {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let Some((sub, rest)) = args.split_first() else {
        return Ok(ShiftCommand::Help);
    };

    match *sub {
        "help" => Ok(ShiftCommand::Help),
        "set" | "backup" => {
            if rest.len() < 2 {
                let usage = if *sub == "set" { SET_USAGE } else { BACKUP_USAGE };
                return Err(ValidationError::Usage(usage));
            }
            let (source, target, options) = (rest[0].to_string(), rest[1].to_string(), owned(&rest[2..]));
            Ok(if *sub == "set" {
                ShiftCommand::Set {
                    source,
                    target,
                    options,
                }
            } else {
                ShiftCommand::Backup {
                    source,
                    target,
                    options,
                }
            })
        }
        "del" => indices_arg(rest, DEL_USAGE).map(|indices| ShiftCommand::Delete { indices }),
        "pause" => indices_arg(rest, PAUSE_USAGE).map(|indices| ShiftCommand::Pause { indices }),
        "resume" => indices_arg(rest, RESUME_USAGE).map(|indices| ShiftCommand::Resume { indices }),
        "list" => Ok(ShiftCommand::List),
        "stats" => Ok(ShiftCommand::Stats),
        "filter" => match rest {
            ["list", index, ..] => Ok(ShiftCommand::FilterList {
                index: index.to_string(),
            }),
            [action @ ("add" | "del"), indices, keywords @ ..] if !keywords.is_empty() => {
                Ok(ShiftCommand::Filter {
                    action: if *action == "add" {
                        FilterAction::Add
                    } else {
                        FilterAction::Del
                    },
                    indices: indices.to_string(),
                    keywords: owned(keywords),
                })
            }
            _ => Err(ValidationError::Usage(FILTER_USAGE)),
        },
        other => Err(ValidationError::UnknownSubcommand(other.to_string())),
    }
}

fn indices_arg(rest: &[&str], usage: &'static str) -> Result<String, ValidationError> {
    if rest.is_empty() {
        return Err(ValidationError::Usage(usage));
    }
    // `del 1, 3` is accepted as well as `del 1,3`.
    Ok(rest.concat())
}

/// 1-based indices resolved against a listing of `len` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSelection {
    /// Zero-based, deduplicated, in input order.
    pub valid: Vec<usize>,
    /// Raw tokens that were not numbers or were out of range.
    pub invalid: Vec<String>,
}

impl IndexSelection {
    pub fn invalid_text(&self) -> String {
        self.invalid.join(", ")
    }
}

/// Parses a comma separated list of 1-based indices such as `1,3,5`.
pub fn parse_indices(input: &str, len: usize) -> IndexSelection {
    let mut selection = IndexSelection::default();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => {
                if !selection.valid.contains(&(n - 1)) {
                    selection.valid.push(n - 1);
                }
            }
            _ => selection.invalid.push(token.to_string()),
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<Result<ShiftCommand, ValidationError>> {
        parse_command(text, "shift")
    }

    #[test]
    fn test_non_command_is_none() {
        assert!(parse("hello there").is_none());
        assert!(parse("shifty set a b").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn test_bare_prefix_is_help() {
        assert_eq!(parse("shift"), Some(Ok(ShiftCommand::Help)));
        assert_eq!(parse("/shift@relay_bot help"), Some(Ok(ShiftCommand::Help)));
    }

    #[test]
    fn test_set_with_options() {
        assert_eq!(
            parse("shift set @news me photo silent"),
            Some(Ok(ShiftCommand::Set {
                source: "@news".to_string(),
                target: "me".to_string(),
                options: vec!["photo".to_string(), "silent".to_string()],
            }))
        );
    }

    #[test]
    fn test_set_missing_target() {
        assert_eq!(
            parse("shift set @news"),
            Some(Err(ValidationError::Usage(SET_USAGE)))
        );
    }

    #[test]
    fn test_filter_forms() {
        assert_eq!(
            parse("shift filter add 1,2 ad spam"),
            Some(Ok(ShiftCommand::Filter {
                action: FilterAction::Add,
                indices: "1,2".to_string(),
                keywords: vec!["ad".to_string(), "spam".to_string()],
            }))
        );
        assert_eq!(
            parse("shift filter list 3"),
            Some(Ok(ShiftCommand::FilterList {
                index: "3".to_string()
            }))
        );
        assert_eq!(
            parse("shift filter add 1"),
            Some(Err(ValidationError::Usage(FILTER_USAGE)))
        );
        assert_eq!(
            parse("shift filter clear 1"),
            Some(Err(ValidationError::Usage(FILTER_USAGE)))
        );
    }

    #[test]
    fn test_unknown_subcommand() {
        assert_eq!(
            parse("shift frobnicate"),
            Some(Err(ValidationError::UnknownSubcommand("frobnicate".to_string())))
        );
    }

    #[test]
    fn test_parse_indices() {
        let selection = parse_indices("1, 3,x,0,9,3", 4);
        assert_eq!(selection.valid, vec![0, 2]);
        assert_eq!(selection.invalid, vec!["x", "0", "9"]);
        assert_eq!(selection.invalid_text(), "x, 0, 9");
    }

    #[test]
    fn test_del_joins_spaced_indices() {
        assert_eq!(
            parse("shift del 1, 2"),
            Some(Ok(ShiftCommand::Delete {
                indices: "1,2".to_string()
            }))
        );
    }
}
