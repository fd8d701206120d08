//! Rendered transactional mail.

use crate::OutgoingMail;

struct VerificationText {
    subject: &'static str,
    title: &'static str,
    greeting: &'static str,
    message: &'static str,
    code_label: &'static str,
    footer: &'static str,
    warning: &'static str,
}

const EN: VerificationText = VerificationText {
    subject: "Verify Your Email - CleanCycle",
    title: "Email Verification",
    greeting: "Hello!",
    message: "Thank you for registering with CleanCycle. Please use the following code to verify your email address:",
    code_label: "Your verification code:",
    footer: "This code will expire in 15 minutes.",
    warning: "If you did not create an account, please ignore this email.",
};

const HU: VerificationText = VerificationText {
    subject: "Email cím megerősítése - CleanCycle",
    title: "Email megerősítés",
    greeting: "Üdvözöljük!",
    message: "Köszönjük, hogy regisztrált a CleanCycle-ra. Kérjük, használja az alábbi kódot email címének megerősítéséhez:",
    code_label: "Megerősítő kód:",
    footer: "Ez a kód 15 percig érvényes.",
    warning: "Ha nem Ön hozta létre ezt a fiókot, kérjük, hagyja figyelmen kívül ezt az emailt.",
};

// Belgian users get the Dutch text.
const NL: VerificationText = VerificationText {
    subject: "Verifieer uw e-mail - CleanCycle",
    title: "E-mailverificatie",
    greeting: "Hallo!",
    message: "Bedankt voor uw registratie bij CleanCycle. Gebruik de volgende code om uw e-mailadres te verifiëren:",
    code_label: "Uw verificatiecode:",
    footer: "Deze code verloopt over 15 minuten.",
    warning: "Als u geen account heeft aangemaakt, negeer dan deze e-mail.",
};

const DE: VerificationText = VerificationText {
    subject: "E-Mail verifizieren - CleanCycle",
    title: "E-Mail-Verifizierung",
    greeting: "Hallo!",
    message: "Vielen Dank für Ihre Registrierung bei CleanCycle. Bitte verwenden Sie den folgenden Code, um Ihre E-Mail-Adresse zu verifizieren:",
    code_label: "Ihr Verifizierungscode:",
    footer: "Dieser Code läuft in 15 Minuten ab.",
    warning: "Wenn Sie kein Konto erstellt haben, ignorieren Sie bitte diese E-Mail.",
};

const FR: VerificationText = VerificationText {
    subject: "Vérifiez votre e-mail - CleanCycle",
    title: "Vérification de l'e-mail",
    greeting: "Bonjour!",
    message: "Merci de vous être inscrit sur CleanCycle. Veuillez utiliser le code suivant pour vérifier votre adresse e-mail:",
    code_label: "Votre code de vérification:",
    footer: "Ce code expirera dans 15 minutes.",
    warning: "Si vous n'avez pas créé de compte, veuillez ignorer cet e-mail.",
};

const IT: VerificationText = VerificationText {
    subject: "Verifica la tua email - CleanCycle",
    title: "Verifica email",
    greeting: "Ciao!",
    message: "Grazie per esserti registrato su CleanCycle. Utilizza il seguente codice per verificare il tuo indirizzo email:",
    code_label: "Il tuo codice di verifica:",
    footer: "Questo codice scadrà tra 15 minuti.",
    warning: "Se non hai creato un account, ignora questa email.",
};

const BG: VerificationText = VerificationText {
    subject: "Потвърдете вашия имейл - CleanCycle",
    title: "Потвърждение на имейл",
    greeting: "Здравейте!",
    message: "Благодарим ви, че се регистрирахте в CleanCycle. Моля, използвайте следния код, за да потвърдите вашия имейл адрес:",
    code_label: "Вашият код за потвърждение:",
    footer: "Този код ще изтече след 15 минути.",
    warning: "Ако не сте създали акаунт, моля игнорирайте този имейл.",
};

const SK: VerificationText = VerificationText {
    subject: "Overte svoj email - CleanCycle",
    title: "Overenie emailu",
    greeting: "Ahoj!",
    message: "Ďakujeme za registráciu v CleanCycle. Použite nasledujúci kód na overenie vašej emailovej adresy:",
    code_label: "Váš overovací kód:",
    footer: "Tento kód vyprší za 15 minút.",
    warning: "Ak ste nevytvorili účet, ignorujte tento email.",
};

fn verification_text(locale: &str) -> &'static VerificationText {
    match locale {
        "hu" => &HU,
        "nl" | "be" => &NL,
        "de" => &DE,
        "fr" => &FR,
        "it" => &IT,
        "bg" => &BG,
        "sk" => &SK,
        _ => &EN,
    }
}

/// Verification code mail in the recipient's locale, English when unknown.
pub fn verification_email(to: &str, code: &str, locale: &str) -> OutgoingMail {
    let t = verification_text(locale);

    let body = format!(
        r#"<p style="margin: 0 0 20px 0; color: #333333; font-size: 16px;">{greeting}</p>
<p style="margin: 0 0 30px 0; color: #666666; font-size: 14px; line-height: 1.6;">{message}</p>
<div style="background-color: #f0fdfa; border: 2px dashed #14b8a6; border-radius: 8px; padding: 30px; text-align: center;">
<p style="margin: 0 0 10px 0; color: #0d9488; font-size: 14px; font-weight: bold; text-transform: uppercase; letter-spacing: 1px;">{label}</p>
<p style="margin: 0; color: #0f766e; font-size: 36px; font-weight: bold; letter-spacing: 8px; font-family: 'Courier New', monospace;">{code}</p>
</div>
<p style="margin: 30px 0 0 0; color: #999999; font-size: 12px; text-align: center;">{footer}</p>"#,
        greeting = t.greeting,
        message = t.message,
        label = t.code_label,
        code = code,
        footer = t.footer,
    );

    let text = format!(
        "{}\n\n{}\n\n{} {}\n\n{}\n\n{}",
        t.greeting, t.message, t.code_label, code, t.footer, t.warning
    );

    OutgoingMail {
        to: to.to_string(),
        subject: t.subject.to_string(),
        text,
        html: Some(layout(t.subject, t.title, &body, t.warning)),
    }
}

/// Mail copy of an in-app notification.
pub fn notification_email(to: &str, message: &str, locale: &str) -> OutgoingMail {
    let subject = match locale {
        "hu" => "Értesítés - CleanCycle",
        _ => "Notification - CleanCycle",
    };
    let body = format!(
        r#"<p style="margin: 0; color: #333333; font-size: 16px; line-height: 1.6;">{}</p>"#,
        escape_html(message)
    );

    OutgoingMail {
        to: to.to_string(),
        subject: subject.to_string(),
        text: message.to_string(),
        html: Some(layout(subject, "CleanCycle", &body, "")),
    }
}

fn layout(subject: &str, title: &str, body: &str, warning: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{subject}</title>
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif; background-color: #f4f4f4;">
<table role="presentation" style="width: 100%; border-collapse: collapse;">
<tr><td align="center" style="padding: 40px 0;">
<table role="presentation" style="width: 600px; border-collapse: collapse; background-color: #ffffff; border-radius: 8px;">
<tr><td style="padding: 40px; text-align: center; background-color: #14b8a6; border-radius: 8px 8px 0 0;">
<h1 style="margin: 0; color: #ffffff; font-size: 28px;">CleanCycle</h1>
<p style="margin: 10px 0 0 0; color: #ffffff; font-size: 16px;">{title}</p>
</td></tr>
<tr><td style="padding: 40px;">
{body}
</td></tr>
<tr><td style="padding: 30px 40px; background-color: #f9fafb; border-radius: 0 0 8px 8px; text-align: center;">
<p style="margin: 0 0 10px 0; color: #999999; font-size: 12px;">{warning}</p>
<p style="margin: 0; color: #999999; font-size: 12px;">&copy; 2025 CleanCycle</p>
</td></tr>
</table>
</td></tr>
</table>
</body>
</html>"#
    )
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_carries_code_in_both_parts() {
        let mail = verification_email("resident@example.com", "482913", "en");
        assert_eq!(mail.subject, "Verify Your Email - CleanCycle");
        assert!(mail.text.contains("482913"));
        assert!(mail.text.contains("15 minutes"));
        assert!(mail.html.unwrap().contains("482913"));
    }

    #[test]
    fn verification_email_is_localized() {
        assert_eq!(
            verification_email("a@example.com", "111111", "hu").subject,
            "Email cím megerősítése - CleanCycle"
        );
        assert_eq!(
            verification_email("a@example.com", "111111", "be").subject,
            verification_email("a@example.com", "111111", "nl").subject
        );
    }

    #[test]
    fn unknown_locale_falls_back_to_english() {
        let mail = verification_email("a@example.com", "111111", "es");
        assert_eq!(mail.subject, EN.subject);
    }

    #[test]
    fn notification_email_escapes_markup() {
        let mail = notification_email("a@example.com", "Washer <1> done", "en");
        assert_eq!(mail.text, "Washer <1> done");
        assert!(mail.html.unwrap().contains("Washer &lt;1&gt; done"));
    }
}
