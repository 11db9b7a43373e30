use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use clap::Args;
use uuid::Uuid;

use super::Commands;
use crate::app::{CategoryEditOutcome, TemplateEditor};
use crate::model::{Color, Direction, EventCardPatch, TitleCardPatch};
use crate::storage::FieldStatus;

#[derive(Args, Debug, Clone)]
pub struct TitleArgs {
    /// New title text
    pub text: String,
    /// Title text color (#RRGGBB)
    #[arg(long)]
    pub text_color: Option<String>,
    /// Title background color (#RRGGBB)
    #[arg(long)]
    pub background_color: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddCardArgs {
    /// Insert position (appended when omitted, clamped to the end)
    #[arg(long)]
    pub at: Option<usize>,
    /// Title for the new card
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MoveCardArgs {
    /// Card identifier
    pub uuid: String,
    /// `up` or `down`
    pub direction: Direction,
    /// Number of places to move
    #[arg(long, default_value_t = 1)]
    pub by: usize,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryArgs {
    /// Card identifier
    pub card: String,
    /// Category name as typed into the card's category field
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct UncategorizeArgs {
    /// Card identifier
    pub card: String,
    /// Untick the box instead, putting the card back into a category
    #[arg(long)]
    pub off: bool,
}

/// Runs one subcommand against an opened editor and returns what to print.
pub fn execute(editor: &mut TemplateEditor, command: Commands) -> Result<String> {
    match command {
        Commands::Show => show(editor),
        Commands::Check => check(editor),
        Commands::Reset => Ok(reset(editor)),
        Commands::Background { color } => background(editor, &color),
        Commands::Title(args) => title(editor, args),
        Commands::AddCard(args) => Ok(add_card(editor, args)),
        Commands::DeleteCard { uuid } => delete_card(editor, &uuid),
        Commands::MoveCard(args) => move_card(editor, args),
        Commands::Category(args) => category(editor, args),
        Commands::Uncategorize(args) => uncategorize(editor, args),
    }
}

pub fn show(editor: &TemplateEditor) -> Result<String> {
    let mut out = serde_json::to_string_pretty(editor.state()).context("serializing template")?;
    out.push('\n');
    Ok(out)
}

pub fn check(editor: &TemplateEditor) -> Result<String> {
    let mut out = String::new();
    let mut failed = 0;
    for (key, status) in editor.stored_fields() {
        let verdict = match status {
            FieldStatus::Absent => "absent (default)".to_string(),
            FieldStatus::Valid(_) => "ok".to_string(),
            FieldStatus::Invalid(err) => {
                failed += 1;
                format!("invalid: {err}")
            }
            FieldStatus::Unreadable(err) => {
                failed += 1;
                format!("unreadable: {err:#}")
            }
        };
        let _ = writeln!(&mut out, "{:<24} {verdict}", key.name());
    }
    if failed > 0 {
        bail!(
            "{out}{failed} stored key{} failed validation",
            if failed == 1 { "" } else { "s" }
        );
    }
    Ok(out)
}

pub fn reset(editor: &mut TemplateEditor) -> String {
    editor.reset_local_storage();
    "Template reset to defaults\n".to_string()
}

pub fn background(editor: &mut TemplateEditor, color: &str) -> Result<String> {
    let color = parse_color(color)?;
    editor.set_background_color(color.clone());
    Ok(format!("Background set to {color}\n"))
}

pub fn title(editor: &mut TemplateEditor, args: TitleArgs) -> Result<String> {
    let patch = TitleCardPatch {
        title: Some(args.text),
        text_color: args.text_color.as_deref().map(parse_color).transpose()?,
        background_color: args.background_color.as_deref().map(parse_color).transpose()?,
    };
    editor.update_title_card(patch);
    Ok(format!("Title set to {:?}\n", editor.title_card().title))
}

pub fn add_card(editor: &mut TemplateEditor, args: AddCardArgs) -> String {
    let uuid = editor.add_card(args.at);
    if let Some(title) = args.title {
        editor.update_card(
            uuid,
            EventCardPatch {
                title: Some(title),
                ..Default::default()
            },
        );
    }
    format!("Added card {uuid}\n")
}

pub fn delete_card(editor: &mut TemplateEditor, uuid: &str) -> Result<String> {
    let uuid = existing_card(editor, uuid)?;
    editor.delete_card(uuid);
    Ok(format!("Deleted card {uuid}\n"))
}

pub fn move_card(editor: &mut TemplateEditor, args: MoveCardArgs) -> Result<String> {
    let uuid = existing_card(editor, &args.uuid)?;
    if args.by == 0 {
        bail!("--by must be at least 1");
    }
    let before = editor.state().card_index(uuid);
    editor.move_card(uuid, args.direction, args.by);
    let after = editor.state().card_index(uuid);
    if before == after {
        bail!(
            "card {uuid} cannot move {} by {}",
            args.direction,
            args.by
        );
    }
    Ok(format!("Moved card {uuid} {} by {}\n", args.direction, args.by))
}

pub fn category(editor: &mut TemplateEditor, args: CategoryArgs) -> Result<String> {
    let card = existing_card(editor, &args.card)?;
    let outcome = editor.edit_card_category(card, &args.name);
    Ok(describe(editor, outcome))
}

pub fn uncategorize(editor: &mut TemplateEditor, args: UncategorizeArgs) -> Result<String> {
    let card = existing_card(editor, &args.card)?;
    let outcome = editor.set_card_uncategorized(card, !args.off);
    Ok(describe(editor, outcome))
}

fn describe(editor: &TemplateEditor, outcome: CategoryEditOutcome) -> String {
    let name = |uuid: Uuid| {
        editor
            .category(uuid)
            .map(|category| format!("'{}'", category.name))
            .unwrap_or_else(|| uuid.to_string())
    };
    match outcome {
        CategoryEditOutcome::Unchanged => "Nothing to change\n".to_string(),
        CategoryEditOutcome::Renamed { category } => format!("Renamed category to {}\n", name(category)),
        CategoryEditOutcome::Fused { from, into } => {
            format!("Fused category {from} into {}\n", name(into))
        }
        CategoryEditOutcome::Switched { to } => format!("Switched card to category {}\n", name(to)),
        CategoryEditOutcome::Created { category } => format!("Created category {}\n", name(category)),
        CategoryEditOutcome::Unassigned { removed: Some(removed) } => {
            format!("Card is uncategorized; removed empty category {removed}\n")
        }
        CategoryEditOutcome::Unassigned { removed: None } => "Card is uncategorized\n".to_string(),
        CategoryEditOutcome::Assigned { category, created } => format!(
            "Card joined {}category {}\n",
            if created { "new " } else { "" },
            name(category)
        ),
    }
}

fn parse_color(raw: &str) -> Result<Color> {
    Color::parse(raw.trim()).with_context(|| format!("parsing color '{raw}'"))
}

fn existing_card(editor: &TemplateEditor, raw: &str) -> Result<Uuid> {
    let uuid = Uuid::parse_str(raw.trim()).with_context(|| format!("parsing card id '{raw}'"))?;
    if editor.card(uuid).is_none() {
        bail!("card {uuid} not found");
    }
    Ok(uuid)
}
