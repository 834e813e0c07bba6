//! User-facing text for command replies.

use chrono::Local;
use shift_core::{OptionSet, Peer, TargetType};
use storage::{Rule, SourceStats};

pub const HELP_TEXT: &str = "📢 Relay assistant

🔧 Commands:
- set <source> <target> [options...] - relay new messages
- del <index>[,<index>...] - delete rules
- backup <source> <target> [options...] - relay existing history
  (needs chat history access; Telegram bots cannot read history, so backup reports it as unsupported)
- list - show rules
- stats - show relay statistics
- pause <index>[,<index>...] - pause rules
- resume <index>[,<index>...] - resume rules
- filter add <index>[,<index>...] <keyword...> - block keywords
- filter del <index>[,<index>...] <keyword...> - unblock keywords
- filter list <index> - show blocked keywords

🎯 Targets:
- channel or group: @channel_username or -1001234567890
- user or bot: @username or a numeric id
- current chat: me, here or this

📝 Options:
- silent - no notification (channels and groups only)
- text, photo, document, video, sticker, animation, voice, audio - only these types
- all - every type (default)

💡 Examples:
shift set @source_channel @target_user silent photo
shift set -1001234567890 me text
shift filter add 1,2 ad spam";

pub fn status_label(rule: &Rule) -> &'static str {
    if rule.paused {
        "⏸️ paused"
    } else {
        "▶️ active"
    }
}

pub fn target_type_label(target_type: TargetType) -> &'static str {
    match target_type {
        TargetType::User => "user",
        TargetType::Chat => "chat",
    }
}

/// One numbered entry of the `list` reply.
pub fn rule_entry(
    index: usize,
    rule: &Rule,
    source_name: &str,
    target: Option<&Peer>,
    target_name: &str,
) -> String {
    let emoji = target.map(Peer::emoji).unwrap_or("📝");
    let mut entry = format!(
        "{}. {}\n   📤 {}\n   📥 {} {}\n   ⚙️ Options: {}\n   🎯 Type: {}\n",
        index,
        status_label(rule),
        source_name,
        emoji,
        target_name,
        rule.options,
        target_type_label(rule.target_type),
    );
    if let Some(created) = rule.created_at {
        entry.push_str(&format!(
            "   📅 Created: {}\n",
            created.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }
    entry
}

pub fn corrupt_entry(index: usize, key: &str) -> String {
    format!("{}. ⚠️ Corrupt rule record: {}\n", index, key)
}

/// Summary sent after `set`, and the header of a backup.
pub fn endpoints(source: &Peer, target: &Peer) -> String {
    format!(
        "📤 Source: {} {}\n📥 Target: {} {}",
        source.emoji(),
        source.display_name(),
        target.emoji(),
        target.display_name()
    )
}

pub fn rule_saved(source: &Peer, target: &Peer, options: &OptionSet, silent_removed: bool) -> String {
    let mut text = String::new();
    if silent_removed {
        text.push_str("⚠️ silent has no effect when relaying to a user and was removed\n\n");
    }
    text.push_str("✅ Relay rule saved\n\n");
    text.push_str(&endpoints(source, target));
    text.push_str(&format!("\n⚙️ Options: {}", options));
    if let Peer::User(_) = target {
        text.push_str("\n\n⚠️ Relaying to a user only works while they have not blocked the bot");
    }
    text
}

pub fn backup_progress(
    source: &Peer,
    target: &Peer,
    forwarded: usize,
    skipped: usize,
    failed: usize,
) -> String {
    format!(
        "🔄 Backup in progress...\n\n{}\n📊 Processed: {} (forwarded: {}, skipped: {}, failed: {})",
        endpoints(source, target),
        forwarded + skipped + failed,
        forwarded,
        skipped,
        failed
    )
}

pub fn backup_done(
    source: &Peer,
    target: &Peer,
    forwarded: usize,
    skipped: usize,
    failed: usize,
) -> String {
    let mut text = format!(
        "✅ Backup finished\n\n{}\n📊 Total: {}\n✅ Forwarded: {}\n⏭️ Skipped: {}",
        endpoints(source, target),
        forwarded + skipped + failed,
        forwarded,
        skipped
    );
    if failed > 0 {
        text.push_str(&format!("\n❌ Failed: {}", failed));
        if let Peer::User(_) = target {
            text.push_str("\n\n💡 Some failures may come from the user's privacy settings");
        }
    }
    text
}

/// One source block of the `stats` reply: totals plus the last seven recorded days.
pub fn stats_entry(stats: &SourceStats, target_type: Option<TargetType>) -> String {
    let target = stats
        .target
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let kind = match target_type {
        Some(TargetType::User) => "👤 user",
        _ => "💬 chat",
    };
    let mut text = format!(
        "📤 Source: {}\n📥 Target: {} ({})\n📈 Total: {}\n",
        stats.source_id, target, kind, stats.total
    );
    let skip = stats.days.len().saturating_sub(7);
    if !stats.days.is_empty() {
        text.push_str("📅 Last 7 days:\n");
        for (date, count) in stats.days.iter().skip(skip) {
            text.push_str(&format!("      {}: {}\n", date, count));
        }
    }
    text
}

/// Appended to index-based replies when some indices were rejected.
pub fn invalid_indices_note(invalid: &[String]) -> String {
    if invalid.is_empty() {
        String::new()
    } else {
        format!("\n⚠️ Invalid or out-of-range indices: {}", invalid.join(", "))
    }
}
