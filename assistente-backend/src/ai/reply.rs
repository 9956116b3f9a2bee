//! Reply generation: prompt assembly from stored history + model invocation.
//!
//! The generator persists nothing itself; the channel adapters own message
//! persistence so this stays a pure function of (stored history, mode, new
//! text) and is unit-testable with a stub model client.

use std::sync::Arc;

use crate::ai::types::{AiError, ModelRole, ModelTurn};
use crate::ai::ModelClient;
use crate::db::Database;
use crate::models::DomainMode;

pub const DEFAULT_HISTORY_LIMIT: usize = 6;

/// Substituted when the model returns nothing usable.
pub const FALLBACK_REPLY: &str = "Desculpe, não consegui gerar uma resposta agora.";

pub(crate) const SYSTEM_GENERIC: &str = "\
Você é o assistente da (Tatione Telecom). Foque em telecom, atendimento claro, prático e humano.
Quando faltar contexto, peça os dados necessários.
";

pub(crate) const SYSTEM_MIKROTIK: &str = "\
Você é um especialista em redes e MikroTik (RouterOS v7).
Regras:
- Sempre prefira comandos v7 com prefixos (ex.: /interface, /ip, /routing).
- Verifique coerência dos comandos e **não use** ações destrutivas sem confirmação (ex.: /system reset-configuration).
- Para NAT básico: use masquerade em out-interface WAN. Para port-forward, use dst-nat + firewall filter quando necessário.
- Para VLAN: use bridge vlan-filtering, portas trunk/access, tagging correto, pvid e frame-types.
- Para PPPoE: server no concentrador, client no CPE. Checar MTU/MRU 1492 e MSS clamp quando aplicável.
- Para Wi-Fi (CAPsMAN ou wifiwave2), dê comandos por perfil e segurança WPA2/WPA3 quando suportado.
- Sempre explique brevemente **por que** os comandos resolvem o problema.
- Se faltar contexto essencial (modelo do roteador, RouterOS versão, interfaces WAN/LAN, VLAN IDs), peça antes.
Formato:
- Devolva trechos de configuração em blocos de código com sintaxe RouterOS.
- Quando possível, dê também comandos de verificação (/interface/print, /ip/address/print, /log/print).
";

pub(crate) fn system_for(mode: DomainMode) -> &'static str {
    match mode {
        DomainMode::Generic => SYSTEM_GENERIC,
        DomainMode::Mikrotik => SYSTEM_MIKROTIK,
    }
}

#[derive(Debug)]
pub enum ReplyError {
    /// Store failure while reading conversation/history. Surfaces as a
    /// 500-equivalent at the adapter, never as a fallback reply.
    Persistence(rusqlite::Error),
    /// Model collaborator failed or is misconfigured. Adapters convert this
    /// into a user-visible apology.
    Generation(AiError),
}

impl std::fmt::Display for ReplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplyError::Persistence(e) => write!(f, "persistence error: {}", e),
            ReplyError::Generation(e) => write!(f, "generation error: {}", e),
        }
    }
}

impl std::error::Error for ReplyError {}

impl From<rusqlite::Error> for ReplyError {
    fn from(err: rusqlite::Error) -> Self {
        ReplyError::Persistence(err)
    }
}

impl From<AiError> for ReplyError {
    fn from(err: AiError) -> Self {
        ReplyError::Generation(err)
    }
}

pub struct ReplyGenerator {
    db: Arc<Database>,
    model: Arc<dyn ModelClient>,
    history_limit: usize,
}

impl ReplyGenerator {
    pub fn new(db: Arc<Database>, model: Arc<dyn ModelClient>) -> Self {
        Self {
            db,
            model,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Generate the assistant reply for a new user turn. The conversation
    /// must exist and `user_text` must be non-empty; the inbound message is
    /// expected to be persisted by the caller before this is invoked.
    pub async fn generate_reply(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> Result<String, ReplyError> {
        if user_text.trim().is_empty() {
            return Err(ReplyError::Generation(AiError::new("empty user text")));
        }

        let conversation = self.db.get_conversation(conversation_id)?.ok_or_else(|| {
            ReplyError::Generation(AiError::new(format!(
                "conversation not found: {}",
                conversation_id
            )))
        })?;

        let mut history = self.db.recent_messages(conversation_id, self.history_limit)?;
        history.reverse();

        let mut turns = Vec::with_capacity(history.len() + 2);
        turns.push(ModelTurn::new(
            ModelRole::User,
            system_for(conversation.domain_mode),
        ));
        for message in &history {
            turns.push(ModelTurn::new(
                ModelRole::from_message_role(message.role),
                message.content.clone(),
            ));
        }
        turns.push(ModelTurn::new(ModelRole::User, user_text));

        let text = self.model.generate(&turns).await?;
        let text = text.trim();
        if text.is_empty() {
            Ok(FALLBACK_REPLY.to_string())
        } else {
            Ok(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockModelClient;
    use crate::models::MessageRole;

    fn setup(mode: DomainMode, responses: Vec<Result<String, AiError>>) -> (Arc<Database>, MockModelClient, ReplyGenerator, String) {
        let db = Arc::new(Database::new(":memory:").expect("in-memory db"));
        let user = db
            .upsert_user_by_username("web_default", "Web User", "web_default@example.com")
            .expect("user");
        let conv = db
            .create_conversation(&user.id, "Web chat", mode)
            .expect("conversation");
        let mock = MockModelClient::new(responses);
        let generator = ReplyGenerator::new(db.clone(), Arc::new(mock.clone()));
        (db, mock, generator, conv.id)
    }

    #[tokio::test]
    async fn prompt_is_system_then_history_then_new_text() {
        let (db, mock, generator, conv_id) = setup(DomainMode::Generic, vec![Ok("resposta".into())]);
        db.create_message(&conv_id, MessageRole::User, "oi").expect("u");
        db.create_message(&conv_id, MessageRole::Assistant, "olá").expect("a");

        let reply = generator.generate_reply(&conv_id, "tudo bem?").await.expect("reply");
        assert_eq!(reply, "resposta");

        let requests = mock.captured_requests();
        assert_eq!(requests.len(), 1);
        let turns = &requests[0];
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, ModelRole::User);
        assert_eq!(turns[0].text, SYSTEM_GENERIC);
        assert_eq!(turns[1].text, "oi");
        assert_eq!(turns[1].role, ModelRole::User);
        assert_eq!(turns[2].text, "olá");
        assert_eq!(turns[2].role, ModelRole::Model);
        assert_eq!(turns[3].text, "tudo bem?");
        assert_eq!(turns[3].role, ModelRole::User);
    }

    #[tokio::test]
    async fn mode_selects_the_system_instruction_block() {
        let (db, mock, generator, conv_id) = setup(DomainMode::Generic, vec![Ok("a".into()), Ok("b".into())]);

        generator.generate_reply(&conv_id, "oi").await.expect("generic reply");
        db.set_conversation_mode(&conv_id, DomainMode::Mikrotik).expect("set mode");
        generator.generate_reply(&conv_id, "nat básico").await.expect("mikrotik reply");

        let requests = mock.captured_requests();
        assert_eq!(requests[0][0].text, SYSTEM_GENERIC);
        assert_eq!(requests[1][0].text, SYSTEM_MIKROTIK);
    }

    #[tokio::test]
    async fn history_is_bounded_and_chronological() {
        let (db, mock, generator, conv_id) = setup(DomainMode::Generic, vec![Ok("ok".into())]);
        for i in 0..10 {
            db.create_message(&conv_id, MessageRole::User, &format!("m{}", i)).expect("m");
        }

        generator.generate_reply(&conv_id, "nova").await.expect("reply");

        let turns = &mock.captured_requests()[0];
        // system + 6 most recent history turns + new text
        assert_eq!(turns.len(), 8);
        let history: Vec<&str> = turns[1..7].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(history, vec!["m4", "m5", "m6", "m7", "m8", "m9"]);
    }

    #[tokio::test]
    async fn history_limit_is_configurable() {
        let db = Arc::new(Database::new(":memory:").expect("in-memory db"));
        let user = db
            .upsert_user_by_username("web_default", "Web User", "web_default@example.com")
            .expect("user");
        let conv = db
            .create_conversation(&user.id, "Web chat", DomainMode::Generic)
            .expect("conversation");
        for i in 0..5 {
            db.create_message(&conv.id, MessageRole::User, &format!("m{}", i)).expect("m");
        }

        let mock = MockModelClient::new(vec![Ok("ok".into())]);
        let generator = ReplyGenerator::new(db, Arc::new(mock.clone())).with_history_limit(2);
        generator.generate_reply(&conv.id, "nova").await.expect("reply");

        let turns = &mock.captured_requests()[0];
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[1].text, "m3");
        assert_eq!(turns[2].text, "m4");
    }

    #[tokio::test]
    async fn reply_is_trimmed() {
        let (_db, _mock, generator, conv_id) = setup(DomainMode::Generic, vec![Ok("  olá!  \n".into())]);
        let reply = generator.generate_reply(&conv_id, "oi").await.expect("reply");
        assert_eq!(reply, "olá!");
    }

    #[tokio::test]
    async fn empty_reply_becomes_the_fallback() {
        let (_db, _mock, generator, conv_id) = setup(DomainMode::Generic, vec![Ok("  \n\t ".into())]);
        let reply = generator.generate_reply(&conv_id, "oi").await.expect("reply");
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn model_failure_is_a_generation_error() {
        let (_db, _mock, generator, conv_id) =
            setup(DomainMode::Generic, vec![Err(AiError::new("boom"))]);
        let err = generator.generate_reply(&conv_id, "oi").await.expect_err("must fail");
        assert!(matches!(err, ReplyError::Generation(_)));
    }

    #[tokio::test]
    async fn unknown_conversation_never_reaches_the_model() {
        let (_db, mock, generator, _conv_id) = setup(DomainMode::Generic, vec![Ok("x".into())]);
        let err = generator.generate_reply("missing", "oi").await.expect_err("must fail");
        assert!(matches!(err, ReplyError::Generation(_)));
        assert!(mock.captured_requests().is_empty());
    }

    #[tokio::test]
    async fn generator_persists_nothing() {
        let (db, _mock, generator, conv_id) = setup(DomainMode::Generic, vec![Ok("resposta".into())]);
        generator.generate_reply(&conv_id, "oi").await.expect("reply");
        assert!(db.recent_messages(&conv_id, 10).expect("recent").is_empty());
    }
}
