// Input masks applied while the patient types. They accept partial input and
// only ever emit as much of the mask as there are digits to fill it.

const CPF_MASK: &str = "000.000.000-00";
const PHONE_MASK_MOBILE: &str = "(00) 00000-0000";
const PHONE_MASK_LANDLINE: &str = "(00) 0000-0000";

pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn format_cpf(input: &str) -> String {
    apply_mask(&digits_only(input), CPF_MASK)
}

pub fn format_phone(input: &str) -> String {
    let digits = digits_only(input);
    if digits.len() > 10 {
        apply_mask(&digits, PHONE_MASK_MOBILE)
    } else {
        apply_mask(&digits, PHONE_MASK_LANDLINE)
    }
}

/// `0` in the mask is a digit slot, everything else is a literal.
fn apply_mask(digits: &str, mask: &str) -> String {
    let mut out = String::with_capacity(mask.len());
    let mut digits = digits.chars().peekable();

    for slot in mask.chars() {
        if digits.peek().is_none() {
            break;
        }
        if slot == '0' {
            if let Some(d) = digits.next() {
                out.push(d);
            }
        } else {
            out.push(slot);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpf_mask() {
        assert_eq!(format_cpf("12345678909"), "123.456.789-09");
        assert_eq!(format_cpf("123.456.789-09"), "123.456.789-09");
        assert_eq!(format_cpf("1234"), "123.4");
        assert_eq!(format_cpf("123456789091234"), "123.456.789-09");
        assert_eq!(format_cpf(""), "");
    }

    #[test]
    fn test_phone_mask() {
        assert_eq!(format_phone("11987654321"), "(11) 98765-4321");
        assert_eq!(format_phone("1134567890"), "(11) 3456-7890");
        assert_eq!(format_phone("11"), "(11");
    }
}
