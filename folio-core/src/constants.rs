#[derive(strum_macros::Display)]
pub enum Constants {
    #[strum(serialize = "noteId")]
    NoteId,

    #[strum(serialize = "paragraphId")]
    ParagraphId,

    #[strum(serialize = "Z_ENV_NOTE_ID")]
    EnvNoteId,

    #[strum(serialize = "Z_ENV_PARAGRAPH_ID")]
    EnvParagraphId,

    #[strum(serialize = "Z_ENV_BATCH_ID")]
    EnvBatchId,

    #[strum(serialize = "Z_ENV_USER_NAME")]
    EnvUserName,

    #[strum(serialize = "Z_ENV_USER_ROLES")]
    EnvUserRoles,
}
