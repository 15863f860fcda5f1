pub const PROMPTDECK_CLI: &str = "promptdeck";
