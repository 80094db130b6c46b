fn main() -> anyhow::Result<()> {
    xcell_launch::run()
}
