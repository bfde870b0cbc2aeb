use anyhow::Result;
use venvcall_sandbox::codec::{select_codec, WireOptions};
use venvcall_sandbox::script::render_script;

pub fn cmd_render(
    source_file: &str,
    function: Option<&str>,
    use_dill: bool,
    with_args: bool,
) -> Result<()> {
    let callable = super::load_callable(source_file, function)?;
    let codec = select_codec(use_dill, WireOptions::default());
    let script = render_script(codec.module_name(), &callable, with_args);
    print!("{}", script);
    Ok(())
}
