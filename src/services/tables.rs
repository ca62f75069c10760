//! Static service definitions
//!
//! Port fields are lists of single ports or `start-end` ranges separated by
//! spaces or commas. The well-known table is expanded first; on a collision
//! the later definition wins.

/// A named service and the ports it listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDef {
    pub name: &'static str,
    pub ports: &'static str,
}

const fn def(name: &'static str, ports: &'static str) -> ServiceDef {
    ServiceDef { name, ports }
}

/// Common services users are likely to allow through the firewall
pub const WELL_KNOWN_SERVICES: &[ServiceDef] = &[
    def("BitTorrent", "6881-6889"),
    def("DHCP", "67-68"),
    def("DNS", "53"),
    def("FTP", "20-21"),
    def("HTTP", "80"),
    def("HTTPS", "443"),
    def("IMAP", "143"),
    def("NFS", "111 2049"),
    def("NNTP", "119"),
    def("NTP", "123"),
    def("POP3", "110"),
    def("Samba (SMB)", "137-139 445"),
    def("SMTP", "25"),
    def("SSH", "22"),
    def("Telnet", "23"),
    def("Xwindows", "6000-6015"),
];

/// Ports of known trojans, exploits and noisy applications
pub const MALICIOUS_SERVICES: &[ServiceDef] = &[
    def("DCOM-scm", "135"),
    def("PhAse zero", "555"),
    def("PC server backdoor", "600"),
    def("Mountd bug", "635"),
    def("Kazaa", "1214"),
    def("Nessus", "1241"),
    def("Subseven", "1234,1243,2772,2773"),
    def("Trin00", "1524,27444,31335"),
    def("SSDP", "1900"),
    def("Backdoor-g/Subseven", "1999"),
    def("CPQ-Wbem", "2301"),
    def("Master's paradise", "3129"),
    def("HotU chat", "3449"),
    def("MS IPSec NAT-T", "4500"),
    def("eDonkey", "4662"),
    def("uPNP", "5000"),
    def("SIP", "5060"),
    def("SIP over TLS", "5061"),
    def("AOL IM", "5190-5193"),
    def("pcAnywhere", "5623"),
    def("VNC reflector", "5999"),
    def("VNC", "5900,5500,5800"),
    def("Gnutella", "6346"),
    def("Deep throat", "6670"),
    def("Sub-7", "6711-6713,6776,16959"),
    def("Gatecrasher", "6969"),
    def("RealAudio", "6970"),
    def("Sub-7 matrix chat", "7215"),
    def("Unreal", "7777-7778"),
    def("SHOUTcast", "8000"),
    def("Teamspeak server", "8767"),
    def("Webadmin", "10000"),
    def("Cheeseworm", "10008"),
    def("Netbus", "12345,12346"),
    def("PowWow", "13223"),
    def("Teamspeak server", "14534"),
    def("Stacheldraht", "16660,60001,65000"),
    def("Conducent", "17027"),
    def("Kuang2", "17300"),
    def("Useradmin", "20000"),
    def("Netbus 2 pro", "20034"),
    def("Acidkor", "20002"),
    def("Girlfriend", "21544"),
    def("Evilftp", "23456"),
    def("Half-life", "27015"),
    def("Backdoor-G or Sub-7", "27374"),
    def("Quake", "27910-27961"),
    def("Netsphere", "30100"),
    def("Back orifice", "31337-31338"),
    def("Hack'a'tack", "31789"),
    def("Sun-RPC portmap", "32770-32900"),
    def("Trinity v3", "33270"),
    def("Traceroute", "33434-33600"),
    def("Inoculan", "41508"),
    def("Teamspeak network", "45647"),
    def("Sockets de troi", "50505"),
    def("Teamspeak query port", "51234"),
    def("Sub-7 spy port", "54283"),
    def("Back orifice 2K", "54320-54321"),
];

/// Expand a port list into individual ports.
///
/// Tokens that are not numbers or ranges are skipped; a reversed range
/// expands to nothing.
pub fn expand_ports(ports: &str) -> Vec<u32> {
    let mut expanded = Vec::new();
    for token in ports.split([' ', ',']).map(str::trim).filter(|t| !t.is_empty()) {
        match token.split_once('-') {
            Some((start, end)) => {
                if let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>()) {
                    expanded.extend(start..=end);
                }
            }
            None => {
                if let Ok(port) = token.parse::<u32>() {
                    expanded.push(port);
                }
            }
        }
    }
    expanded
}
