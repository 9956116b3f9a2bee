mod conversations;
mod messages;
mod users;
