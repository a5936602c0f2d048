// ============================================================================
// SERVICE : EMAILS
// ============================================================================
//
// Description:
//   Interface vers le collaborateur d'envoi d'emails. L'envoi est
//   "fire-and-forget": dispatch() lance une tâche tokio et retourne tout de
//   suite. Un échec d'envoi est loggé, il ne fait jamais échouer
//   l'inscription ou la demande de reset.
//
// ============================================================================

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::users;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub recipients: Vec<String>,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
}

//trait = Interface du transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Transport par défaut: écrit l'email dans les logs (pas de SMTP intégré)
pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        // Le corps contient un token: on ne logge que l'enveloppe
        tracing::info!(
            sender = %self.sender,
            recipients = ?email.recipients,
            subject = %email.subject,
            "email handed to log transport"
        );
        Ok(())
    }
}

/// Envoie l'email en arrière-plan, sans bloquer l'appelant
pub fn dispatch(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        let subject = email.subject.clone();
        if let Err(e) = mailer.send(email).await {
            tracing::warn!(error = %e, subject = %subject, "email delivery failed");
        }
    });
}

pub fn password_reset_email(user: &users::Model, base_url: &str, token: &str) -> OutgoingEmail {
    let link = format!("{}/reset-password?token={}", base_url, token);
    OutgoingEmail {
        subject: "[ScrumJET] Reset Your Password".to_string(),
        recipients: vec![user.email.clone()],
        text_body: format!(
            "Dear {},\n\nTo reset your password, open the following link:\n\n{}\n\n\
             If you did not request a password reset, simply ignore this message.\n",
            user.username, link
        ),
        html_body: format!(
            "<p>Dear {},</p><p>To reset your password, <a href=\"{}\">click here</a>.</p>\
             <p>If you did not request a password reset, simply ignore this message.</p>",
            user.username, link
        ),
    }
}

pub fn confirmation_email(user: &users::Model, base_url: &str, token: &str) -> OutgoingEmail {
    let link = format!("{}/api/auth/confirm-email?token={}", base_url, token);
    OutgoingEmail {
        subject: "[ScrumJET] Confirm Your Email".to_string(),
        recipients: vec![user.email.clone()],
        text_body: format!(
            "Welcome {},\n\nPlease confirm your email address by opening:\n\n{}\n",
            user.username, link
        ),
        html_body: format!(
            "<p>Welcome {},</p><p>Please <a href=\"{}\">confirm your email address</a>.</p>",
            user.username, link
        ),
    }
}

/// Extrait le token d'un lien `?token=...` (tests)
#[cfg(test)]
pub fn token_from(email: &OutgoingEmail) -> String {
    let start = email.text_body.find("token=").expect("token in body") + "token=".len();
    email.text_body[start..]
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Transport de test: pousse chaque email dans un canal
#[cfg(test)]
pub struct ChannelMailer {
    tx: tokio::sync::mpsc::UnboundedSender<OutgoingEmail>,
}

#[cfg(test)]
impl ChannelMailer {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<OutgoingEmail>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for ChannelMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        self.tx
            .send(email)
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

/// Transport de test qui échoue toujours
#[cfg(test)]
pub struct FailingMailer;

#[cfg(test)]
#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: OutgoingEmail) -> Result<(), MailError> {
        Err(MailError::Transport("smtp unreachable".to_string()))
    }
}
