use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

/// Single "Watch Now" button opening the release page.
pub fn build_watch_keyboard(url: Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::url("▶️ Watch Now", url)]])
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;

    #[test]
    fn test_watch_keyboard_links_to_release() {
        let url = Url::parse("https://anilist.co/anime/1").unwrap();
        let keyboard = build_watch_keyboard(url.clone());

        assert_eq!(keyboard.inline_keyboard.len(), 1);
        let button = &keyboard.inline_keyboard[0][0];
        assert_eq!(button.text, "▶️ Watch Now");
        assert_eq!(button.kind, InlineKeyboardButtonKind::Url(url));
    }
}
