use edge_relay::server::utils::playlist_utils::{PlaylistLine, PlaylistUtil, UriReference};
use url::Url;

fn original() -> Url {
    Url::parse("https://h/a/b/master.m3u8").unwrap()
}

fn relayed(target: &str) -> String {
    format!("/proxy?url={}", urlencoding::encode(target))
}

#[test]
fn test_classifies_lines() {
    assert_eq!(PlaylistLine::classify("#EXTM3U"), PlaylistLine::Directive);
    assert_eq!(PlaylistLine::classify("#EXTINF:10.0,"), PlaylistLine::Directive);
    assert_eq!(PlaylistLine::classify(""), PlaylistLine::Blank);
    assert_eq!(PlaylistLine::classify("   "), PlaylistLine::Blank);
    assert_eq!(
        PlaylistLine::classify("https://cdn.example.com/x.ts"),
        PlaylistLine::Uri(UriReference::Absolute)
    );
    assert_eq!(
        PlaylistLine::classify("HTTP://cdn.example.com/x.ts"),
        PlaylistLine::Uri(UriReference::Absolute)
    );
    assert_eq!(
        PlaylistLine::classify("/live/seg1.ts"),
        PlaylistLine::Uri(UriReference::RootRelative)
    );
    assert_eq!(
        PlaylistLine::classify("seg1.ts"),
        PlaylistLine::Uri(UriReference::Relative)
    );
}

#[test]
fn test_absolute_line_is_wrapped_as_written() {
    let line = "https://cdn.example.com/path/seg.ts?token=a&b=c";
    assert_eq!(
        PlaylistUtil::rewrite_line(line, &original()),
        format!(
            "/proxy?url={}",
            "https%3A%2F%2Fcdn.example.com%2Fpath%2Fseg.ts%3Ftoken%3Da%26b%3Dc"
        )
    );
}

#[test]
fn test_root_relative_line_uses_original_host() {
    assert_eq!(
        PlaylistUtil::rewrite_line("/live/seg1.ts", &original()),
        relayed("https://h/live/seg1.ts")
    );
}

#[test]
fn test_root_relative_line_keeps_non_default_port() {
    let original = Url::parse("http://h:8080/a/master.m3u8").unwrap();
    assert_eq!(
        PlaylistUtil::rewrite_line("/live/seg1.ts", &original),
        relayed("http://h:8080/live/seg1.ts")
    );
}

#[test]
fn test_relative_line_resolves_against_playlist_directory() {
    // rfc 3986 joining: the last path segment is dropped, the directory is kept
    assert_eq!(
        PlaylistUtil::rewrite_line("seg1.ts", &original()),
        relayed("https://h/a/b/seg1.ts")
    );
    assert_eq!(
        PlaylistUtil::rewrite_line("../seg1.ts", &original()),
        relayed("https://h/a/seg1.ts")
    );
    assert_eq!(
        PlaylistUtil::rewrite_line("720p/index.m3u8?x=1", &original()),
        relayed("https://h/a/b/720p/index.m3u8?x=1")
    );
}

#[test]
fn test_directives_and_blank_lines_are_untouched() {
    let body = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n\n#EXTINF:9.009,title\n   \n";
    assert_eq!(PlaylistUtil::rewrite(body, &original()), body);
}

#[test]
fn test_unresolvable_line_is_kept() {
    // an invalid port can't be joined onto anything
    let line = "//bad host:99999/seg.ts";
    assert_eq!(PlaylistUtil::rewrite_line(line, &original()), line);
}

#[test]
fn test_rewrite_keeps_order_and_line_endings() {
    let body = "#EXTM3U\r\n#EXTINF:10,\r\nseg1.ts\r\n#EXTINF:10,\nhttps://x.io/seg2.ts";
    let expected = format!(
        "#EXTM3U\r\n#EXTINF:10,\r\n{}\r\n#EXTINF:10,\n{}",
        relayed("https://h/a/b/seg1.ts"),
        relayed("https://x.io/seg2.ts")
    );

    assert_eq!(PlaylistUtil::rewrite(body, &original()), expected);
}

#[test]
fn test_every_uri_line_points_at_the_relay() {
    let body = "#EXTM3U\nseg1.ts\n/abs/seg2.ts\nhttp://other.host/seg3.ts\n#EXT-X-ENDLIST\n";
    let rewritten = PlaylistUtil::rewrite(body, &original());

    for line in rewritten.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        assert!(line.starts_with("/proxy?url="), "line not relayed: {}", line);
        assert!(!line.contains("://"), "raw upstream url leaked: {}", line);
    }
}

#[test]
fn test_is_playlist_url_only_looks_at_path_suffix() {
    assert!(PlaylistUtil::is_playlist_url(
        &Url::parse("https://h/live/index.m3u8?token=1").unwrap()
    ));
    assert!(!PlaylistUtil::is_playlist_url(
        &Url::parse("https://h/live/seg.ts?f=index.m3u8").unwrap()
    ));
    assert!(!PlaylistUtil::is_playlist_url(
        &Url::parse("https://h/live/index.m3u").unwrap()
    ));
}
