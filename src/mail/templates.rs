use super::OutgoingEmail;
use crate::users::model::VwoLevel;

pub fn verification_link(base_url: &str, token: &str) -> String {
    format!("{base_url}/auth/verify-email?token={token}")
}

pub fn verification_email(to: &str, name: &str, link: &str, ttl_hours: i64) -> OutgoingEmail {
    let subject = "Bevestig je e-mailadres - Exam Training Platform".to_string();
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="nl">
<head><meta charset="UTF-8"><title>{subject}</title></head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1>Exam Training Platform</h1>
  <h2>Hallo {name}!</h2>
  <p>Bedankt voor je registratie. Bevestig je e-mailadres om je account te activeren.</p>
  <p><a href="{link}" style="background:#2563eb;color:#fff;padding:15px 30px;border-radius:5px;text-decoration:none;">E-mailadres Bevestigen</a></p>
  <p>Of kopieer deze link in je browser:<br>{link}</p>
  <p><strong>Belangrijk:</strong> deze verificatielink is {ttl_hours} uur geldig. Daarna moet je een nieuwe verificatie aanvragen.</p>
  <p>Heb je je niet geregistreerd? Dan kun je deze e-mail negeren.</p>
</body>
</html>"#
    );
    let text = format!(
        "Exam Training Platform - E-mailadres Verificatie\n\n\
         Hallo {name}!\n\n\
         Bedankt voor je registratie. Klik op deze link om je e-mailadres te verifiëren:\n\
         {link}\n\n\
         Deze verificatielink is {ttl_hours} uur geldig. Daarna moet je een nieuwe verificatie aanvragen.\n\n\
         Heb je je niet geregistreerd? Dan kun je deze e-mail negeren.\n"
    );
    OutgoingEmail {
        to: to.to_string(),
        subject,
        html,
        text,
    }
}

pub fn welcome_email(to: &str, name: &str, level: VwoLevel, base_url: &str) -> OutgoingEmail {
    let dashboard = format!("{base_url}/dashboard");
    let subject = "Welkom bij de Exam Training Platform! 🎉".to_string();
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="nl">
<head><meta charset="UTF-8"><title>{subject}</title></head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1>Account Geactiveerd!</h1>
  <h2>Gefeliciteerd {name}!</h2>
  <p>Je e-mailadres is geverifieerd en je account is actief. Je bent klaar om te beginnen met je {level} Wiskunde B voorbereiding!</p>
  <p><a href="{dashboard}" style="background:#059669;color:#fff;padding:15px 30px;border-radius:5px;text-decoration:none;">Start met Oefenen</a></p>
</body>
</html>"#
    );
    let text = format!(
        "Account Geactiveerd!\n\n\
         Gefeliciteerd {name}!\n\n\
         Je e-mailadres is geverifieerd en je account is actief. Je bent klaar om te beginnen met je {level} Wiskunde B voorbereiding!\n\n\
         Start met oefenen: {dashboard}\n"
    );
    OutgoingEmail {
        to: to.to_string(),
        subject,
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_points_at_verify_page() {
        assert_eq!(
            verification_link("https://examtraining.nl", "abc_-1"),
            "https://examtraining.nl/auth/verify-email?token=abc_-1"
        );
    }

    #[test]
    fn verification_mail_carries_link_in_both_bodies() {
        let link = verification_link("http://localhost:3000", "tok");
        let mail = verification_email("jan@example.com", "Jan", &link, 24);
        assert_eq!(mail.to, "jan@example.com");
        assert!(mail.subject.starts_with("Bevestig je e-mailadres"));
        assert!(mail.html.contains(&link));
        assert!(mail.text.contains(&link));
        assert!(mail.text.contains("24 uur geldig"));
    }

    #[test]
    fn welcome_mail_mentions_level_and_dashboard() {
        let mail = welcome_email("jan@example.com", "Jan", VwoLevel::Vwo5, "http://localhost:3000");
        assert!(mail.text.contains("VWO 5 Wiskunde B"));
        assert!(mail.html.contains("http://localhost:3000/dashboard"));
    }
}
