//! Line-oriented parsing of board definitions.
//!
//! Every line is parsed on its own. A line that cannot be understood is
//! skipped with a `SyntaxIssue` warning; nothing in the text can make
//! [`parse`] fail or panic.

use std::collections::HashMap;
use std::path::Path;

use pinmux_core::{Diagnostic, DiagnosticKind, Pin, ResourceRef, ResourceType};
use serde::{Deserialize, Serialize};

use crate::error::{BoardError, Result};
use crate::hints::{ChipHint, ChipHints};
use crate::model::{
    AdvisoryChannel, ConfigModel, Passthrough, ResourceAssignment, Setting, TimerAnnotation,
};

/// What to do when the same `(type, index)` resource is declared twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The later declaration replaces the earlier one (warning).
    #[default]
    LastWins,
    /// The earlier declaration is kept (warning).
    FirstWins,
    /// The earlier declaration is kept and the duplicate is an error.
    Reject,
}

/// Parser options.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub duplicates: DuplicatePolicy,
}

/// A parsed model plus every problem found while parsing.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub model: ConfigModel,
    pub diagnostics: Vec<Diagnostic>,
}

enum Statement {
    Resource(ResourceAssignment),
    ClearResource { resource: ResourceType, index: u8 },
    Timer(TimerAnnotation),
    TimerComment { pin: Pin, advisory: AdvisoryChannel },
    Setting(Setting),
    Hint(ChipHint),
    Mcu(String),
    BoardName(String),
    ManufacturerId(String),
    Passthrough(Passthrough),
}

/// Load and parse a board definition file.
pub fn load_board(path: &Path, options: &ParseOptions) -> Result<ParseOutput> {
    if !path.exists() {
        return Err(BoardError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    tracing::info!("parsing board definition {}", path.display());
    Ok(parse_with(&content, options))
}

/// Parse board-definition text with default options.
pub fn parse(text: &str) -> ParseOutput {
    parse_with(text, &ParseOptions::default())
}

/// Parse board-definition text.
pub fn parse_with(text: &str, options: &ParseOptions) -> ParseOutput {
    let mut diagnostics = Vec::new();
    let statements: Vec<Statement> = text
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| parse_line(raw, i + 1, &mut diagnostics))
        .collect();

    let model = assemble(statements, options, &mut diagnostics);
    tracing::debug!(
        resources = model.resources.len(),
        timers = model.timers.len(),
        settings = model.settings.len(),
        passthrough = model.passthrough.len(),
        issues = diagnostics.len(),
        "parsed board definition"
    );
    ParseOutput { model, diagnostics }
}

fn syntax(line: usize, message: impl Into<String>) -> Diagnostic {
    Diagnostic::warning(DiagnosticKind::SyntaxIssue, message).with_line(line)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_line(raw: &str, line: usize, diagnostics: &mut Vec<Diagnostic>) -> Option<Statement> {
    let text = raw.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return None;
    }

    if let Some(rest) = text.strip_prefix("#define") {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return parse_define(text, rest, line, diagnostics);
        }
    }
    if text.starts_with('#') {
        return parse_comment(text);
    }

    let (keyword, rest) = match text.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (text, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    match keyword.to_ascii_lowercase().as_str() {
        "resource" => parse_resource(&args, line, diagnostics),
        "timer" => parse_timer(&args, line, diagnostics),
        "set" => parse_setting(rest, line, diagnostics),
        "board_name" => match args.first() {
            Some(name) => Some(Statement::BoardName(name.to_string())),
            None => {
                diagnostics.push(syntax(line, "board_name without a value"));
                None
            }
        },
        "manufacturer_id" => match args.first() {
            Some(id) => Some(Statement::ManufacturerId(id.to_string())),
            None => {
                diagnostics.push(syntax(line, "manufacturer_id without a value"));
                None
            }
        },
        other if is_identifier(other) => Some(Statement::Passthrough(Passthrough {
            keyword: other.to_string(),
            text: text.to_string(),
            line,
        })),
        _ => {
            diagnostics.push(syntax(line, format!("unrecognized statement '{text}'")));
            None
        }
    }
}

fn parse_define(
    text: &str,
    rest: &str,
    line: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Statement> {
    let Some(name) = rest.split_whitespace().next() else {
        diagnostics.push(syntax(line, "#define without a name"));
        return None;
    };
    match ChipHint::from_define(name, line) {
        Some(hint) => Some(Statement::Hint(hint)),
        None => Some(Statement::Passthrough(Passthrough {
            keyword: "#define".to_string(),
            text: text.to_string(),
            line,
        })),
    }
}

/// Comments carry two kinds of information: the MCU in the dump header and
/// advisory timer/channel notes. Anything else is ignored.
fn parse_comment(text: &str) -> Option<Statement> {
    let body = text.trim_start_matches('#').trim();

    if body.contains("Betaflight") {
        return body
            .split(|c: char| !c.is_ascii_alphanumeric())
            .find(|token| token.starts_with("STM32") && token.len() > "STM32".len())
            .map(|token| Statement::Mcu(token.to_string()));
    }

    // `# pin B04: TIM3 CH1 (AF2)`
    let rest = body.strip_prefix("pin ")?;
    let (pin_token, detail) = rest.split_once(':')?;
    let pin = Pin::parse_board_token(pin_token.trim()).ok()?;
    let mut words = detail.split_whitespace();
    let timer = words.next().filter(|w| w.starts_with("TIM"))?;
    let channel_word = words.next()?.strip_prefix("CH")?;
    let digits: String = channel_word
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let channel = digits.parse().ok()?;
    Some(Statement::TimerComment {
        pin,
        advisory: AdvisoryChannel {
            timer: timer.to_string(),
            channel,
        },
    })
}

fn parse_resource(args: &[&str], line: usize, diagnostics: &mut Vec<Diagnostic>) -> Option<Statement> {
    if args.len() < 3 {
        diagnostics.push(syntax(line, "expected `resource <TYPE> <INDEX> <PIN>`"));
        return None;
    }
    if args.len() > 3 {
        diagnostics.push(syntax(
            line,
            format!("ignoring trailing tokens after `resource`: {}", args[3..].join(" ")),
        ));
    }

    if !is_identifier(args[0]) {
        diagnostics.push(syntax(line, format!("invalid resource type '{}'", args[0])));
        return None;
    }
    let resource = ResourceType::from_keyword(args[0]);

    let index = match args[1].parse::<u8>() {
        Ok(index) if index > 0 => index,
        _ => {
            diagnostics.push(syntax(
                line,
                format!(
                    "resource index '{}' must be a positive number; assignment dropped",
                    args[1]
                ),
            ));
            return None;
        }
    };

    if args[2].eq_ignore_ascii_case("NONE") {
        return Some(Statement::ClearResource { resource, index });
    }

    match Pin::parse_board_token(args[2]) {
        Ok(pin) => Some(Statement::Resource(ResourceAssignment {
            resource,
            index,
            pin,
            line,
        })),
        Err(_) => {
            diagnostics.push(
                syntax(
                    line,
                    format!(
                        "pin token '{}' is not a port letter followed by two digits; assignment dropped",
                        args[2]
                    ),
                )
                .with_resource(ResourceRef::new(resource, index)),
            );
            None
        }
    }
}

fn parse_timer(args: &[&str], line: usize, diagnostics: &mut Vec<Diagnostic>) -> Option<Statement> {
    if args.len() < 2 {
        diagnostics.push(syntax(line, "expected `timer <PIN> AF<N>`"));
        return None;
    }

    let pin = match Pin::parse_board_token(args[0]) {
        Ok(pin) => pin,
        Err(_) => {
            diagnostics.push(syntax(
                line,
                format!("timer pin token '{}' is not a port letter followed by two digits", args[0]),
            ));
            return None;
        }
    };

    let af = args[1]
        .get(..2)
        .filter(|prefix| prefix.eq_ignore_ascii_case("AF"))
        .and_then(|_| args[1][2..].parse::<u8>().ok())
        .filter(|af| *af <= 15);
    let Some(af) = af else {
        diagnostics.push(
            syntax(
                line,
                format!("expected an alternate function `AF0`..`AF15`, found '{}'", args[1]),
            )
            .with_pin(pin),
        );
        return None;
    };

    if args.len() > 2 {
        diagnostics.push(
            syntax(
                line,
                format!("ignoring trailing tokens after `timer`: {}", args[2..].join(" ")),
            )
            .with_pin(pin),
        );
    }

    Some(Statement::Timer(TimerAnnotation {
        pin,
        af,
        advisory: None,
        line,
    }))
}

fn parse_setting(rest: &str, line: usize, diagnostics: &mut Vec<Diagnostic>) -> Option<Statement> {
    let Some((key, value)) = rest.split_once('=') else {
        diagnostics.push(syntax(line, "expected `set <KEY> = <VALUE>`"));
        return None;
    };
    let key = key.trim();
    if !is_identifier(key) {
        diagnostics.push(syntax(line, format!("invalid setting name '{key}'")));
        return None;
    }
    Some(Statement::Setting(Setting {
        key: key.to_ascii_lowercase(),
        value: value.trim().to_string(),
        line,
    }))
}

fn assemble(
    statements: Vec<Statement>,
    options: &ParseOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> ConfigModel {
    let mut model = ConfigModel::default();
    let mut hints = Vec::new();
    let mut advisories: HashMap<Pin, AdvisoryChannel> = HashMap::new();

    for statement in statements {
        match statement {
            Statement::Resource(assignment) => {
                insert_resource(&mut model.resources, assignment, options.duplicates, diagnostics)
            }
            Statement::ClearResource { resource, index } => model
                .resources
                .retain(|r| !(r.resource == resource && r.index == index)),
            Statement::Timer(timer) => {
                match model.timers.iter_mut().find(|t| t.pin == timer.pin) {
                    Some(existing) => {
                        diagnostics.push(
                            Diagnostic::warning(
                                DiagnosticKind::DuplicateResource,
                                format!(
                                    "timer for {} already declared on line {}; AF{} from this line wins",
                                    timer.pin, existing.line, timer.af
                                ),
                            )
                            .with_pin(timer.pin)
                            .with_line(timer.line),
                        );
                        *existing = timer;
                    }
                    None => model.timers.push(timer),
                }
            }
            Statement::TimerComment { pin, advisory } => {
                advisories.insert(pin, advisory);
            }
            Statement::Setting(setting) => {
                match model.settings.iter_mut().find(|s| s.key == setting.key) {
                    Some(existing) => *existing = setting,
                    None => model.settings.push(setting),
                }
            }
            Statement::Hint(hint) => hints.push(hint),
            Statement::Mcu(mcu) => model.metadata.mcu = Some(mcu),
            Statement::BoardName(name) => model.metadata.board_name = Some(name),
            Statement::ManufacturerId(id) => model.metadata.manufacturer_id = Some(id),
            Statement::Passthrough(p) => model.passthrough.push(p),
        }
    }

    for timer in &mut model.timers {
        timer.advisory = advisories.remove(&timer.pin);
    }
    model.chip_hints = ChipHints::fold(hints);
    model
}

fn insert_resource(
    resources: &mut Vec<ResourceAssignment>,
    assignment: ResourceAssignment,
    policy: DuplicatePolicy,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(pos) = resources
        .iter()
        .position(|r| r.resource == assignment.resource && r.index == assignment.index)
    else {
        resources.push(assignment);
        return;
    };

    let identity = assignment.identity();
    let previous = &resources[pos];
    let diagnostic = match policy {
        DuplicatePolicy::LastWins => Diagnostic::warning(
            DiagnosticKind::DuplicateResource,
            format!(
                "{identity} already assigned to {} on line {}; the later assignment to {} wins",
                previous.pin, previous.line, assignment.pin
            ),
        ),
        DuplicatePolicy::FirstWins => Diagnostic::warning(
            DiagnosticKind::DuplicateResource,
            format!(
                "{identity} already assigned to {} on line {}; ignoring the later assignment to {}",
                previous.pin, previous.line, assignment.pin
            ),
        ),
        DuplicatePolicy::Reject => Diagnostic::error(
            DiagnosticKind::DuplicateResource,
            format!(
                "{identity} declared twice (lines {} and {}); keeping {}",
                previous.line, assignment.line, previous.pin
            ),
        ),
    }
    .with_resource(identity)
    .with_pin(assignment.pin)
    .with_line(assignment.line);
    diagnostics.push(diagnostic);

    if policy == DuplicatePolicy::LastWins {
        resources[pos] = assignment;
    }
}
