/// Format whole dollars with thousands separators: $1,234 / -$500
pub fn money(val: i64) -> String {
    let negative = val < 0;
    let digits = val.abs().to_string();

    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}")
    } else {
        format!("${with_commas}")
    }
}
