use once_cell::sync::Lazy;
use regex::Regex;

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_#`~]").expect("valid markup pattern"));

static EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        "[",
        "\u{1F000}-\u{1FAFF}", // pictographs, emoticons, transport, symbols
        "\u{2600}-\u{27BF}",   // misc symbols and dingbats
        "\u{2300}-\u{23FF}",   // misc technical (hourglass, watch)
        "\u{2B00}-\u{2BFF}",   // arrows, stars
        "\u{FE00}-\u{FE0F}",   // variation selectors
        "\u{200D}",            // zero width joiner
        "]"
    ))
    .expect("valid emoji pattern")
});

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid space pattern"));

/// Strip emphasis markers and emoji so the text reads cleanly when spoken.
///
/// Applying it twice gives the same result as once.
pub fn clean_for_speech(text: &str) -> String {
    let without_markup = MARKUP.replace_all(text, "");
    let without_emoji = EMOJI.replace_all(&without_markup, "");
    without_emoji
        .lines()
        .map(|line| SPACES.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
