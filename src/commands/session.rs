use crate::kv::KvStore;
use crate::session::Session;

pub(crate) fn cmd_login(kv: &KvStore, email: &str, password: &str) -> anyhow::Result<()> {
    let mut session = Session::restore(kv.clone())?;
    let user = session.login(email, password)?;
    println!("Logged in as {} ({:?})", user.name, user.role);
    Ok(())
}

pub(crate) fn cmd_logout(kv: &KvStore) -> anyhow::Result<()> {
    let mut session = Session::restore(kv.clone())?;
    session.logout()?;
    println!("Logged out");
    Ok(())
}

pub(crate) fn cmd_whoami(kv: &KvStore) -> anyhow::Result<()> {
    let session = Session::restore(kv.clone())?;
    match session.user() {
        Some(user) => println!("{} <{}> ({:?})", user.name, user.email, user.role),
        None => println!("Not logged in"),
    }
    Ok(())
}
