use switchyard::Releaser;

fn main() -> anyhow::Result<()> {
    Releaser::new().run()?;
    Ok(())
}
