//! Generates the standalone program run inside the isolated environment.
//!
//! The program reads its three artifact paths from `sys.argv[1..=3]`
//! (input, output, string args), in that order.

use crate::callable::CallableSpec;

/// Global through which the function body can read the string args.
pub const STRING_ARGS_GLOBAL: &str = "virtualenv_string_args";

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '\t')
}

fn leading_indent(line: &str) -> &str {
    let content = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - content.len()]
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

/// Remove the whitespace prefix common to every non-blank line.
///
/// Mirrors Python's `textwrap.dedent`: tabs and spaces are not equivalent,
/// and lines holding only spaces or tabs are reduced to their line ending.
pub fn dedent(text: &str) -> String {
    let mut margin: Option<&str> = None;
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if is_blank(line) {
            continue;
        }
        let indent = leading_indent(line);
        margin = Some(match margin {
            None => indent,
            Some(m) => common_prefix(m, indent),
        });
    }
    let margin = margin.unwrap_or("");

    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (content, newline) = match line.strip_suffix('\n') {
            Some(c) => (c, "\n"),
            None => (line, ""),
        };
        if is_blank(content.strip_suffix('\r').unwrap_or(content)) {
            out.push_str(newline);
        } else {
            out.push_str(content.strip_prefix(margin).unwrap_or(content));
            out.push_str(newline);
        }
    }
    out
}

/// Program text for one invocation.
///
/// `codec_module` is the Python module used for both loading arguments and
/// dumping the result. When `args_written` is false no input file exists and
/// the program starts from empty containers instead of reading one.
pub fn render_script(codec_module: &str, callable: &CallableSpec, args_written: bool) -> String {
    let load_args = if args_written {
        format!(
            "with open(sys.argv[1], \"rb\") as f: arg_dict = {}.load(f)",
            codec_module
        )
    } else {
        "arg_dict = {\"args\": [], \"kwargs\": {}}".to_string()
    };
    let source = dedent(callable.source());

    format!(
        "import {codec}\n\
         import sys\n\
         {load_args}\n\
         args = arg_dict[\"args\"]\n\
         kwargs = arg_dict[\"kwargs\"]\n\
         with open(sys.argv[3], 'r') as f:\n    \
         {global} = list(map(lambda x: x.strip(), list(f)))\n\
         {source}\n\
         res = {name}(*args, **kwargs)\n\
         with open(sys.argv[2], 'wb') as f:\n    \
         res is not None and {codec}.dump(res, f)\n",
        codec = codec_module,
        load_args = load_args,
        global = STRING_ARGS_GLOBAL,
        source = source.trim_end(),
        name = callable.name(),
    )
}
