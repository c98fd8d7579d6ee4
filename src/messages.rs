// ABOUTME: User-facing chat message texts for registration, reopen and lifecycle notices
// ABOUTME: Keeps every outbound string in one place so flows only choose which to send
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::fmt::Write;

use crate::models::MonthKey;

/// Instructions for installing the spreadsheet app, appended to registration confirmations
pub const SPREADSHEET_APP_GUIDE: &str = "\n\nGoogleスプレッドシートアプリのインストールをお願いします。\nスマートフォンからの編集には、専用アプリが必要です。\n\n【Androidの方】\nGoogle スプレッドシート\nhttps://play.google.com/store/apps/details?id=com.google.android.apps.docs.editors.sheets\n\n【iPhoneの方】\nGoogle スプレッドシート\nhttps://apps.apple.com/jp/app/google-%E3%82%B9%E3%83%97%E3%83%AC%E3%83%83%E3%83%89%E3%82%B7%E3%83%BC%E3%83%88/id842849113";

const GMAIL_REQUEST: &str =
    "Gmailアドレスを登録してください。\nGmailアドレスを送信してください。\n例：example@gmail.com";

// ============================================================================
// Registration
// ============================================================================

/// Registration succeeded
#[must_use]
pub fn registered(last_name: &str) -> String {
    format!("登録OK：{last_name}先生\n今後はこのLINEでシフト連絡します。{SPREADSHEET_APP_GUIDE}")
}

/// Suffix confirming a stored email
#[must_use]
pub fn email_registered_suffix(email: &str) -> String {
    format!("\n\nメールアドレスを登録しました：{email}")
}

/// Suffix asking for a Gmail address
#[must_use]
pub fn gmail_request_suffix() -> String {
    format!("\n\n{GMAIL_REQUEST}")
}

/// Standalone Gmail request addressed to a teacher
#[must_use]
pub fn gmail_request(last_name: &str) -> String {
    format!("{last_name}先生、{GMAIL_REQUEST}")
}

/// Pending email request completed
#[must_use]
pub fn email_request_completed(email: &str, last_name: &str) -> String {
    format!("メールアドレスを登録しました：{email}\n\n{last_name}先生、登録が完了しました。")
}

/// Message lacked a usable name
pub const NEED_NAME_AND_GMAIL: &str =
    "お名前（フルネーム）とGmailアドレスの両方を送ってください。\n例：山田太郎 taro@gmail.com";

/// Name matched several roster entries
#[must_use]
pub fn ambiguous_name(candidates: &[String]) -> String {
    format!(
        "同じ氏名が複数います（候補：{}）\nフルネームをそのまま送ってください（空白は気にしなくてOK）。",
        candidates.join(" / ")
    )
}

/// Name belongs to a different chat identity
#[must_use]
pub fn linked_elsewhere(name: &str) -> String {
    format!("この氏名は別のLINEと紐付いています：{name}\n教室まで連絡してください。")
}

/// Identity moved to a new chat account after email verification
#[must_use]
pub fn relinked(last_name: &str) -> String {
    format!("新しいシステムが導入されました。\nアカウントを変更しましたか？再登録しました：{last_name}先生")
}

/// Registration replayed with the stored email
#[must_use]
pub fn already_registered(last_name: &str) -> String {
    format!("既に登録済みです：{last_name}先生")
}

/// Registration replayed without any new information
pub const ALREADY_REGISTERED: &str = "既に登録済みです";

/// Submitted email differs from the stored one
#[must_use]
pub fn confirm_email_change(current: &str, submitted: &str) -> String {
    format!(
        "登録されているメールアドレスと違います。\n現在: {current}\n送信: {submitted}\n\n変更しますか？「はい」または「いいえ」と送信してください。"
    )
}

/// Email change committed
#[must_use]
pub fn email_changed(email: &str) -> String {
    format!("メールアドレスを変更しました：{email}")
}

/// Email change declined
pub const EMAIL_CHANGE_CANCELLED: &str = "メールアドレスの変更をキャンセルしました。";

/// Yes/no prompt repeated
pub const EMAIL_CHANGE_REPROMPT: &str =
    "メールアドレスの変更を続けますか？\n「はい」または「いいえ」と送信してください。";

/// Teacher vanished between prompt and answer
pub const TEACHER_MISSING: &str = "エラー：講師情報が見つかりませんでした。";

// ============================================================================
// Admin reopen
// ============================================================================

/// No submitted record for the named teacher, optionally narrowed to a month
#[must_use]
pub fn no_submitted_records(name: &str, month: Option<MonthKey>, status: Option<&str>) -> String {
    let mut text = format!("提出済みのデータが見つかりません：{name}");
    if let Some(month) = month {
        let _ = write!(text, " {month}");
    }
    if let Some(status) = status {
        let _ = write!(text, "（状態: {status}）");
    }
    text.push_str("\n提出済み（status='submitted'）のデータが必要です。");
    text
}

/// Numbered month menu
#[must_use]
pub fn month_menu(name: &str, months: &[MonthKey]) -> String {
    let mut text = format!("{name}先生の提出済みシフトが複数あります。\n変更したい月を選択してください：\n");
    for (index, month) in months.iter().enumerate() {
        let _ = writeln!(text, "{}. {month}", index + 1);
    }
    text.push_str("\n月を送信してください（例：2026-01）");
    text
}

/// Month reply was not in the menu
#[must_use]
pub fn invalid_month_choice(months: &[MonthKey]) -> String {
    let mut text = "無効な選択です。以下の月から選択してください：".to_owned();
    for (index, month) in months.iter().enumerate() {
        let _ = write!(text, "\n{}. {month}", index + 1);
    }
    text
}

/// Change request named a month that does not exist
#[must_use]
pub fn invalid_unlock_month(month: &str) -> String {
    format!("無効な月です：{month}\n月は1〜12の範囲で指定してください（例：変更依頼 山田太郎 2026-03）")
}

/// Record has no document link
pub const DOCUMENT_URL_MISSING: &str = "シートURLが見つかりません";

/// Document link does not carry a file id
pub const DOCUMENT_ID_INVALID: &str = "シートIDの取得に失敗しました";

/// Reopen refused for lack of an email
#[must_use]
pub fn reopen_needs_email(last_name: &str) -> String {
    format!("ロック解除に失敗しました：{last_name}先生のメールアドレスが登録されていません。Teachersシートにメールアドレスを追加してください。")
}

/// Reopen failed at the document provider
#[must_use]
pub fn reopen_failed(last_name: &str, month: MonthKey, diagnostic: &str) -> String {
    format!("ロック解除に失敗しました：{last_name}先生（{month}）\n\n{diagnostic}")
}

/// Generic reopen failure after a month choice
pub const REOPEN_FAILED: &str = "エラー：ロック解除に失敗しました。";

/// Reopen confirmation for the admin
#[must_use]
pub fn reopened(last_name: &str, month: MonthKey) -> String {
    format!("ロック解除しました：{last_name}先生（{month}）")
}

/// Reopen notice pushed to the teacher
#[must_use]
pub fn reopen_notice(last_name: &str, month: MonthKey, url: &str) -> String {
    format!(
        "【シフト変更依頼】\n{last_name}先生（{month}）のシフトを変更していただくようお願いします。\nシートの編集が可能になりました。\n\n※編集するには登録したGmailでGoogleにログインしてください。\n変更後、☑（提出）を入れてください。\n{url}"
    )
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Document link pushed after intake
#[must_use]
pub fn document_ready(month: MonthKey, url: &str) -> String {
    format!(
        "【シフト提出URL（{month}）】\n{url}\n\n※編集するには登録したGmailでGoogleにログインしてください。\n入力後、☑（提出）を入れてください。"
    )
}

/// Intake found no template for the month
#[must_use]
pub fn template_unavailable(month: MonthKey) -> String {
    format!("{month}のシフト申請用紙はありません。管理者に連絡してください。")
}

/// Submission acknowledgement
#[must_use]
pub fn submission_acknowledged(last_name: &str, month: MonthKey) -> String {
    format!("【提出受理】\n{last_name}先生（{month}）のシフト提出を受け付けました。ありがとうございます！")
}

/// Reminder pushed to an unsubmitted teacher
#[must_use]
pub fn unsubmitted_reminder(last_name: &str, month: MonthKey, url: Option<&str>) -> String {
    let mut text = format!("【シフト未提出リマインド】\n{last_name}先生（{month}）の提出がまだのようです。");
    match url {
        Some(url) => {
            let _ = write!(text, "\nこちらから入力・提出（☑）をお願いします。\n{url}");
        }
        None => text.push_str(
            "\nシフト申請用紙の準備がまだのようです。管理者に連絡するか、フォーム送信をお待ちください。",
        ),
    }
    text
}

/// Admin asked to prepare a missing template
#[must_use]
pub fn template_missing_for_admin(month: MonthKey) -> String {
    format!("【シフト申請用紙作成依頼】\n{month}のシフト申請用紙のテンプレートが準備されていません。\nシフト申請用紙を作成してください。")
}

/// Initial request pushed to each teacher
#[must_use]
pub fn initial_request(last_name: &str, month: MonthKey) -> String {
    format!("【シフト申請のお願い】\n{last_name}先生、{month}のシフト申請をお願いします。")
}

/// Admin report after the initial request
#[must_use]
pub fn initial_request_report(month: MonthKey, notified: &[String]) -> String {
    let mut text = format!(
        "【シフト申請依頼の送信結果】\n{month}のシフト申請用紙のテンプレートは準備されています。\n\n"
    );
    if notified.is_empty() {
        text.push_str("LINE User IDが登録されている講師がいませんでした。");
    } else {
        let _ = writeln!(
            text,
            "以下の講師（{}名）にシフト申請依頼を送信しました：",
            notified.len()
        );
        for (index, name) in notified.iter().enumerate() {
            let _ = writeln!(text, "{}. {name}", index + 1);
        }
    }
    text.push_str("\n全コースの申請フォームは既存のシステム（フォーム送信）でコピー・作成してください。");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_menu_is_numbered() {
        let months = [
            MonthKey::new(2026, 2).unwrap(),
            MonthKey::new(2026, 3).unwrap(),
        ];
        let text = month_menu("鈴木一郎", &months);
        assert!(text.contains("1. 2026-02\n2. 2026-03"));
        assert!(text.ends_with("月を送信してください（例：2026-01）"));
    }

    #[test]
    fn reminder_mentions_missing_document() {
        let month = MonthKey::new(2026, 3).unwrap();
        assert!(unsubmitted_reminder("山田", month, None).contains("準備がまだ"));
        assert!(unsubmitted_reminder("山田", month, Some("https://x")).ends_with("https://x"));
    }
}
