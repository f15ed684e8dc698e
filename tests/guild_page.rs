// tests/guild_page.rs
use std::fs;

use guild_tracker::FetchError;
use guild_tracker::roster::{Rank, Vocation, parse};
use guild_tracker::specs::guild::{FileFetcher, PageFetcher, classify_page, member_table_text};

const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Guilds</title>
<script src="https://cdn.cloudflare.example/x.js"></script></head>
<body>
<table class="layout"><tr><td>
  <table class="news">
    <tr><td>Welcome back!</td></tr>
    <tr><td>Server save at 10:00</td></tr>
  </table>
</td><td>
  <table class="TableContent">
    <tr><td>Rank</td><td>Name and Title</td><td>Vocation</td><td>Level</td><td>Joining Date</td><td>Status</td></tr>
    <tr><td>Leader</td><td><a href="?name=John+Doe">John Doe</a></td><td>Elite Knight</td><td>250</td><td>Jan&#160;05&#160;2024</td><td>online</td></tr>
    <tr><td></td><td><a href="?name=Ann+Lee">Ann Lee</a></td><td>Elder Druid</td><td>180</td><td>Feb&#160;10&#160;2024</td><td>offline</td></tr>
    <tr><td>Vice Leader</td><td><a href="?name=Bo+Chen">Bo Chen</a></td><td>Royal Paladin</td><td>175</td><td>Feb&nbsp;11&nbsp;2024</td><td>offline</td></tr>
    <tr><td>Member</td><td>Cy</td><td>Sorcerer</td><td>90</td><td>Mar 01 2024</td><td></td></tr>
    <tr><td></td><td>Dee Tom &amp; Co</td><td>Monk</td><td>61</td><td>Mar 02 2024</td><td>online</td></tr>
    <tr><td>&nbsp;</td><td>&nbsp;</td></tr>
  </table>
</td></tr></table>
</body></html>"#;

#[test]
fn member_table_is_the_innermost_one_mentioning_vocation() {
    let text = member_table_text(PAGE).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("Rank\tName and Title\tVocation"));
    assert!(lines[2].starts_with("\tAnn Lee\t"));
    assert!(!text.contains("Welcome"));
}

#[test]
fn page_parses_into_ranked_members() {
    let text = classify_page(PAGE).unwrap();
    let ms = parse(&text);

    let got: Vec<(Rank, &str, Vocation)> = ms.iter().map(|m| (m.rank, m.name.as_str(), m.vocation)).collect();
    assert_eq!(
        got,
        vec![
            (Rank::Leader, "John Doe", Vocation::EliteKnight),
            (Rank::Leader, "Ann Lee", Vocation::ElderDruid),
            (Rank::ViceLeader, "Bo Chen", Vocation::RoyalPaladin),
            (Rank::Member, "Cy", Vocation::Sorcerer),
            (Rank::Member, "Dee Tom & Co", Vocation::Monk),
        ]
    );
    assert_eq!(ms[0].joining_date, "Jan 05 2024");
    assert_eq!(ms[2].joining_date, "Feb 11 2024");
    assert_eq!(ms[3].level, "90");
}

#[test]
fn marker_pages_are_classified() {
    let missing = "<html><body><p>Guild not found.</p></body></html>";
    assert!(matches!(classify_page(missing), Err(FetchError::NotFound(_))));

    let blocked = "<html><title>Just a moment...</title><body>checking your browser</body></html>";
    assert!(matches!(classify_page(blocked), Err(FetchError::Blocked(_))));

    let empty = "<html><body><table><tr><td>News</td></tr></table></body></html>";
    assert!(matches!(classify_page(empty), Err(FetchError::TableMissing)));
}

#[test]
fn file_fetcher_reads_saved_pages_and_plain_text() {
    let dir = tempfile::tempdir().unwrap();

    let html = dir.path().join("page.html");
    fs::write(&html, PAGE).unwrap();
    let text = FileFetcher::new(&html).fetch_guild_table("ignored").unwrap();
    assert_eq!(parse(&text).len(), 5);

    let plain = dir.path().join("roster.txt");
    fs::write(&plain, "Rank Name\nMember\nZed Druid 40 Apr 04 2024\n").unwrap();
    let text = FileFetcher::new(&plain).fetch_guild_table("ignored").unwrap();
    let ms = parse(&text);
    assert_eq!(ms.len(), 1);
    assert_eq!(ms[0].rank, Rank::Member);

    let gone = FileFetcher::new(dir.path().join("nope.html")).fetch_guild_table("x");
    assert!(matches!(gone, Err(FetchError::Io(_))));
}
