pub trait NormalizeString {
    /// Normalizes line endings by stripping `\r` and guarantees a trailing `\n`.
    fn normalize(&self) -> String;
}

impl NormalizeString for str {
    fn normalize(&self) -> String {
        let mut out = self.replace("\r\n", "\n").replace('\r', "\n");
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}
