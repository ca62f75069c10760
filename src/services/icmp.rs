//! ICMP type names

/// Name of an ICMP message type. Total over 0-255; anything larger is "Unknown".
pub fn icmp_type_name(type_code: u32) -> &'static str {
    match type_code {
        0 => "Echo reply",
        1 | 2 => "Unassigned",
        3 => "Dest. unreachable",
        4 => "Source quench",
        5 => "Redirect",
        6 => "Alternate host address",
        7 => "Unassigned",
        8 => "Echo",
        9 => "Router advertisement",
        10 => "Router selection",
        11 => "Time exceeded",
        12 => "Parameter problem",
        13 => "Timestamp",
        14 => "Timestamp reply",
        15 => "Information request",
        16 => "Information reply",
        17 => "Address mask request",
        18 => "Address mask reply",
        19..=29 => "Reserved",
        30 => "Traceroute",
        31 => "Datagram conversion error",
        32 => "Mobile host redirect",
        33 => "IPv6 where-are-you",
        34 => "IPv6 I-am-here",
        35 => "Mobile registration request",
        36 => "mobile registration reply",
        37..=255 => "Reserved",
        _ => "Unknown",
    }
}
