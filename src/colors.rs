/// Terminal color selection for orbrew output.
///
/// Order of precedence:
/// - `--no-color` on the command line
/// - `NO_COLOR` (https://no-color.org/), any value
/// - `CLICOLOR_FORCE` set to non-zero forces colors, even without a TTY
/// - `CLICOLOR=0` disables colors
/// - otherwise colors follow whether stdout is a terminal
use colored::control;

pub fn init_colors(no_color_flag: bool) {
    control::set_override(colors_enabled(
        no_color_flag,
        |name| std::env::var(name).ok(),
        std::io::IsTerminal::is_terminal(&std::io::stdout()),
    ));
}

fn colors_enabled(
    no_color_flag: bool,
    env: impl Fn(&str) -> Option<String>,
    is_tty: bool,
) -> bool {
    if no_color_flag || env("NO_COLOR").is_some() {
        return false;
    }
    if env("CLICOLOR_FORCE").is_some_and(|v| v != "0") {
        return true;
    }
    if env("CLICOLOR").is_some_and(|v| v == "0") {
        return false;
    }
    is_tty
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_flag_and_no_color_win() {
        assert!(!colors_enabled(true, env_from(&[("CLICOLOR_FORCE", "1")]), true));
        assert!(!colors_enabled(false, env_from(&[("NO_COLOR", "")]), true));
    }

    #[test]
    fn test_clicolor_rules() {
        assert!(colors_enabled(false, env_from(&[("CLICOLOR_FORCE", "1")]), false));
        assert!(!colors_enabled(false, env_from(&[("CLICOLOR", "0")]), true));
        assert!(colors_enabled(false, env_from(&[]), true));
        assert!(!colors_enabled(false, env_from(&[]), false));
    }
}
