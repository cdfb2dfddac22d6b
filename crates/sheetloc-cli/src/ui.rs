// Status lines for humans. Results go to stdout, notices to stderr.

#[macro_export]
macro_rules! ui_ok {
    ($($arg:tt)*) => {{
        println!("✔ {}", format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! ui_info {
    ($($arg:tt)*) => {{
        eprintln!("ℹ {}", format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! ui_warn {
    ($($arg:tt)*) => {{
        use std::io::IsTerminal;
        if std::io::stderr().is_terminal() && std::env::var_os("NO_ICONS").is_none() {
            eprintln!("⚠ {}", format_args!($($arg)*));
        } else {
            eprintln!("{}", format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! ui_err {
    ($($arg:tt)*) => {{
        eprintln!("✖ {}", format_args!($($arg)*));
    }};
}
