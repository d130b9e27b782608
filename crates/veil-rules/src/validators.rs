//! Pure predicates used by patterns to reject spurious matches.

/// Words that mark a match as a table header or form label rather than a name.
const NAME_STOP_WORDS: &[&str] = &[
    "name", "first", "last", "middle", "full", "address", "street", "city", "state", "zip",
    "code", "phone", "email", "number", "date", "birth", "account", "card", "type", "status",
];

/// Luhn checksum over a credit-card-like string.
///
/// Strips non-digits, requires 13-19 digits, and checks the alternating
/// double-sum mod 10.
pub fn luhn_valid(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }
    luhn_checksum(&digits) == 0
}

/// Luhn sum mod 10 over a digit slice, rightmost digit is the check digit.
pub fn luhn_checksum(digits: &[u32]) -> u32 {
    let mut sum = 0;
    for (i, &d) in digits.iter().rev().enumerate() {
        let mut d = d;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10
}

/// ABA routing checksum: weights 3-7-1 over nine digits, sum mod 10 == 0.
pub fn aba_valid(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 9 {
        return false;
    }
    aba_checksum(&digits) == 0
}

pub fn aba_checksum(digits: &[u32]) -> u32 {
    const WEIGHTS: [u32; 9] = [3, 7, 1, 3, 7, 1, 3, 7, 1];
    digits
        .iter()
        .zip(WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum::<u32>()
        % 10
}

/// Exactly four dot-separated octets, each in 0-255.
pub fn ipv4_plausible(value: &str) -> bool {
    let octets: Vec<&str> = value.split('.').collect();
    if octets.len() != 4 {
        return false;
    }
    octets.iter().all(|o| {
        !o.is_empty() && o.len() <= 3 && o.chars().all(|c| c.is_ascii_digit()) && {
            // leading zeros are fine, value range is not
            o.parse::<u32>().map(|v| v <= 255).unwrap_or(false)
        }
    })
}

/// Month/year with `/` or `-` separator, month in 1-12.
pub fn expiry_plausible(value: &str) -> bool {
    let sep = if value.contains('/') {
        '/'
    } else if value.contains('-') {
        '-'
    } else {
        return false;
    };
    let mut parts = value.splitn(2, sep);
    let month = match parts.next().and_then(|m| m.trim().parse::<u32>().ok()) {
        Some(m) => m,
        None => return false,
    };
    let year_ok = parts
        .next()
        .map(|y| {
            let y = y.trim();
            (y.len() == 2 || y.len() == 4) && y.chars().all(|c| c.is_ascii_digit())
        })
        .unwrap_or(false);
    (1..=12).contains(&month) && year_ok
}

/// 2-4 alphabetic tokens, none of which is a structural stop-word.
///
/// Rejects table-header false positives like "Name Street Address City".
pub fn plausible_person_name(value: &str) -> bool {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if tokens.len() < 2 || tokens.len() > 4 {
        return false;
    }
    tokens.iter().all(|t| {
        let bare = t.trim_end_matches('.');
        !bare.is_empty()
            && bare.chars().all(|c| c.is_alphabetic())
            && !NAME_STOP_WORDS.contains(&bare.to_ascii_lowercase().as_str())
    })
}
