use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// `30s`, `10m`, `1h15m30s`, `2d`. A bare number is seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut total = 0u64;
        let mut digits = String::new();
        let mut parts = 0;

        for c in s.trim().chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let scale = match c {
                's' => 1,
                'm' => 60,
                'h' => 3_600,
                'd' => 86_400,
                c if c.is_whitespace() => continue,
                other => return Err(format!("Invalid duration unit: {}", other)),
            };
            let amount: u64 = digits
                .parse()
                .map_err(|_| format!("Missing number before '{}' in {:?}", c, s))?;
            total += amount * scale;
            digits.clear();
            parts += 1;
        }

        if !digits.is_empty() {
            total += digits
                .parse::<u64>()
                .map_err(|_| format!("Invalid number in duration {:?}", s))?;
            parts += 1;
        }

        if parts == 0 {
            return Err("Duration must include a number".to_string());
        }
        if total == 0 {
            return Err("Duration must be longer than zero".to_string());
        }
        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut secs = self.0.as_secs();
        let mut out = String::new();
        for (unit, scale) in [("d", 86_400), ("h", 3_600), ("m", 60)] {
            if secs >= scale {
                out.push_str(&format!("{}{}", secs / scale, unit));
                secs %= scale;
            }
        }
        if secs > 0 || out.is_empty() {
            out.push_str(&format!("{}s", secs));
        }
        f.write_str(&out)
    }
}
